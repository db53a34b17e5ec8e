use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{ConfirmationCode, SubscriberEmail, SubscriptionRequest, SubscriptionStatus};

/// 保存在 `newsletter_subscribers` 表中的订阅者
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: SubscriberEmail,
    pub status: SubscriptionStatus,
    pub store_id: i64,
    pub website_id: i64,
    pub customer_id: Option<i64>,
    pub confirmation_code: ConfirmationCode,
    pub status_changed_at: DateTime<Utc>,
}

impl Subscriber {
    /// 绑定邮箱并设置状态和店铺,得到一条待保存的记录
    ///
    /// 状态在构造时就必须给出,记录不会处于未设置状态
    pub fn subscribe(request: &SubscriptionRequest, status: SubscriptionStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: request.email.clone(),
            status,
            store_id: request.store_id,
            website_id: request.website_id,
            customer_id: request.requesting_user_id,
            confirmation_code: ConfirmationCode::generate(),
            status_changed_at: Utc::now(),
        }
    }

    pub fn is_confirmation_pending(&self) -> bool {
        self.status == SubscriptionStatus::NotActive
    }
}
