use super::SubscriberEmail;

/// 每个请求的调用方信息,由传输层提供
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    /// 访客为 `None`
    pub customer_id: Option<i64>,
    pub store_id: i64,
    pub website_id: i64,
}

impl CallerContext {
    pub fn guest(store_id: i64, website_id: i64) -> Self {
        Self {
            customer_id: None,
            store_id,
            website_id,
        }
    }

    pub fn customer(customer_id: i64, store_id: i64, website_id: i64) -> Self {
        Self {
            customer_id: Some(customer_id),
            store_id,
            website_id,
        }
    }

    /// 只有正数 id 才算已登录的客户
    pub fn authenticated_customer(&self) -> Option<i64> {
        self.customer_id.filter(|id| *id > 0)
    }
}

/// 一次订阅请求,处理完即丢弃
#[derive(Debug, Clone)]
pub struct SubscriptionRequest {
    pub email: SubscriberEmail,
    pub requesting_user_id: Option<i64>,
    pub store_id: i64,
    pub website_id: i64,
}

impl SubscriptionRequest {
    pub fn new(email: SubscriberEmail, context: &CallerContext) -> Self {
        Self {
            email,
            requesting_user_id: context.authenticated_customer(),
            store_id: context.store_id,
            website_id: context.website_id,
        }
    }
}
