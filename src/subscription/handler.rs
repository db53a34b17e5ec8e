use std::sync::Arc;

use anyhow::Context;

use super::{
    NewsletterConfig, StatusChangeNotifier, SubscriberRepository, SubscriptionValidator,
    ValidationError,
};
use crate::{
    domain::{CallerContext, Subscriber, SubscriberEmail, SubscriptionRequest, SubscriptionStatus},
    utils::error_chain_fmt,
};

/// `subscribeEmailToNewsletter` 的返回值
#[derive(Debug, serde::Serialize, PartialEq)]
pub struct SubscriptionOutcome {
    pub status: SubscriptionStatus,
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("You must specify an email address to subscribe to a newsletter.")]
    MissingEmail,
    #[error("Enter a valid email address.")]
    InvalidEmail(String),
    #[error("{0}")]
    Rejected(String),
    /// 具体原因只写进日志,不返回给调用方
    #[error("Cannot create a newsletter subscription.")]
    Unexpected(#[source] anyhow::Error),
}

impl std::fmt::Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl SubscribeError {
    /// 所有失败都按输入错误返回
    pub fn category(&self) -> &'static str {
        "graphql-input"
    }
}

impl From<ValidationError> for SubscribeError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::Rejected(message) => SubscribeError::Rejected(message),
            ValidationError::Unexpected(e) => SubscribeError::Unexpected(e),
        }
    }
}

pub struct SubscribeEmailToNewsletter {
    validator: Arc<dyn SubscriptionValidator>,
    config: Arc<dyn NewsletterConfig>,
    repository: Arc<dyn SubscriberRepository>,
    notifier: Arc<dyn StatusChangeNotifier>,
}

impl SubscribeEmailToNewsletter {
    pub fn new(
        validator: Arc<dyn SubscriptionValidator>,
        config: Arc<dyn NewsletterConfig>,
        repository: Arc<dyn SubscriberRepository>,
        notifier: Arc<dyn StatusChangeNotifier>,
    ) -> Self {
        Self {
            validator,
            config,
            repository,
            notifier,
        }
    }

    /// 校验 -> 决定状态 -> 保存 -> 通知 -> 返回状态
    ///
    /// 校验全部通过之后才会保存,失败的请求不会留下订阅记录
    #[tracing::instrument(
        name = "Subscribing an email to the newsletter",
        skip(self, email, context),
        fields(
            subscriber_email = %email.unwrap_or_default(),
            customer_id = ?context.customer_id,
            store_id = context.store_id,
            website_id = context.website_id,
        )
    )]
    pub async fn execute(
        &self,
        email: Option<&str>,
        context: &CallerContext,
    ) -> Result<SubscriptionOutcome, SubscribeError> {
        let email = match email {
            Some(email) if !email.trim().is_empty() => email,
            _ => return Err(SubscribeError::MissingEmail),
        };
        let email =
            SubscriberEmail::parse(email.to_string()).map_err(SubscribeError::InvalidEmail)?;
        let request = SubscriptionRequest::new(email, context);

        self.validate(&request).await.inspect_err(log_unexpected)?;

        let subscriber = self
            .subscribe(&request)
            .await
            .map_err(SubscribeError::Unexpected)
            .inspect_err(log_unexpected)?;

        Ok(SubscriptionOutcome {
            status: subscriber.status,
        })
    }

    async fn validate(&self, request: &SubscriptionRequest) -> Result<(), SubscribeError> {
        match request.requesting_user_id {
            Some(customer_id) => {
                self.validator
                    .validate_email_available(&request.email, customer_id, request.website_id)
                    .await?
            }
            None => {
                self.validator
                    .validate_guest_subscription(request.store_id)
                    .await?
            }
        }
        self.validator
            .validate_already_subscribed(&request.email, request.website_id)
            .await?;
        Ok(())
    }

    async fn subscribe(&self, request: &SubscriptionRequest) -> Result<Subscriber, anyhow::Error> {
        let confirmation_required = self
            .config
            .is_confirmation_required(request.store_id)
            .await
            .context("Failed to read the newsletter confirmation setting.")?;
        let status = SubscriptionStatus::for_new_subscription(confirmation_required);

        let subscriber = self
            .repository
            .save(&Subscriber::subscribe(request, status))
            .await
            .context("Failed to save the newsletter subscriber.")?;

        self.notifier
            .notify_status_change(&subscriber)
            .await
            .context("Failed to send the subscription status email.")?;

        Ok(subscriber)
    }
}

fn log_unexpected(e: &SubscribeError) {
    if let SubscribeError::Unexpected(inner) = e {
        tracing::error!(
            error.cause_chain = ?inner,
            error.message = %inner,
            "Cannot create a newsletter subscription"
        );
    }
}
