use async_trait::async_trait;
use sqlx::PgPool;

use super::{find_customer_by_email, find_subscriber_status, is_guest_subscription_allowed};
use crate::{
    domain::{SubscriberEmail, SubscriptionStatus},
    subscription::{SubscriptionValidator, ValidationError},
};

pub struct PgSubscriptionValidator {
    pool: PgPool,
}

impl PgSubscriptionValidator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionValidator for PgSubscriptionValidator {
    #[tracing::instrument(name = "Validate email is available", skip(self, email))]
    async fn validate_email_available(
        &self,
        email: &SubscriberEmail,
        customer_id: i64,
        website_id: i64,
    ) -> Result<(), ValidationError> {
        match find_customer_by_email(&self.pool, email, website_id).await? {
            Some(owner) if owner != customer_id => Err(ValidationError::Rejected(
                "This email address is already assigned to another user.".into(),
            )),
            _ => Ok(()),
        }
    }

    #[tracing::instrument(name = "Validate guest subscription", skip(self))]
    async fn validate_guest_subscription(&self, store_id: i64) -> Result<(), ValidationError> {
        if is_guest_subscription_allowed(&self.pool, store_id).await? {
            Ok(())
        } else {
            Err(ValidationError::Rejected(
                "Guests can not subscribe to the newsletter. \
                You must create an account to subscribe."
                    .into(),
            ))
        }
    }

    #[tracing::instrument(name = "Validate email is not subscribed yet", skip(self, email))]
    async fn validate_already_subscribed(
        &self,
        email: &SubscriberEmail,
        website_id: i64,
    ) -> Result<(), ValidationError> {
        match find_subscriber_status(&self.pool, email, website_id).await? {
            Some(SubscriptionStatus::Subscribed) => Err(ValidationError::Rejected(
                "This email address is already subscribed.".into(),
            )),
            _ => Ok(()),
        }
    }
}
