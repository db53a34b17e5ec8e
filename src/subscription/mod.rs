//! 订阅处理用到的外部协作者,以及 `subscribeEmailToNewsletter` 的处理逻辑
mod handler;

pub use handler::{SubscribeEmailToNewsletter, SubscribeError, SubscriptionOutcome};

use async_trait::async_trait;

use crate::{
    domain::{Subscriber, SubscriberEmail},
    utils::error_chain_fmt,
};

/// 校验失败的原因
///
/// `Rejected` 的内容会原样返回给调用方
#[derive(thiserror::Error)]
pub enum ValidationError {
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl std::fmt::Debug for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[async_trait]
pub trait SubscriptionValidator: Send + Sync {
    /// 邮箱不能属于同一网站下的其他客户账号
    async fn validate_email_available(
        &self,
        email: &SubscriberEmail,
        customer_id: i64,
        website_id: i64,
    ) -> Result<(), ValidationError>;

    /// 店铺必须允许访客订阅
    async fn validate_guest_subscription(&self, store_id: i64) -> Result<(), ValidationError>;

    /// 同一网站下该邮箱不能已经是订阅状态
    async fn validate_already_subscribed(
        &self,
        email: &SubscriberEmail,
        website_id: i64,
    ) -> Result<(), ValidationError>;
}

#[async_trait]
pub trait NewsletterConfig: Send + Sync {
    async fn is_confirmation_required(&self, store_id: i64) -> Result<bool, anyhow::Error>;
}

#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    /// 按 (email, website) 新建或更新订阅者,返回保存后的记录
    async fn save(&self, subscriber: &Subscriber) -> Result<Subscriber, anyhow::Error>;
}

#[async_trait]
pub trait StatusChangeNotifier: Send + Sync {
    async fn notify_status_change(&self, subscriber: &Subscriber) -> Result<(), anyhow::Error>;
}
