use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::subscription::NewsletterConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct Store {
    pub id: i64,
    pub website_id: i64,
}

#[tracing::instrument(name = "Get store by code", skip(pool))]
pub async fn find_store_by_code(pool: &PgPool, code: &str) -> Result<Option<Store>, sqlx::Error> {
    sqlx::query_as::<_, Store>(r#"SELECT id, website_id FROM stores WHERE code = $1"#)
        .bind(code)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to execute query: {:?}", e);
            e
        })
}

#[tracing::instrument(name = "Check whether guests may subscribe", skip(pool))]
pub async fn is_guest_subscription_allowed(
    pool: &PgPool,
    store_id: i64,
) -> Result<bool, anyhow::Error> {
    let allowed: Option<bool> =
        sqlx::query_scalar(r#"SELECT newsletter_allow_guest FROM stores WHERE id = $1"#)
            .bind(store_id)
            .fetch_optional(pool)
            .await
            .context("Failed to read the guest subscription setting.")?;
    allowed.with_context(|| format!("Store {} does not exist.", store_id))
}

pub struct PgNewsletterConfig {
    pool: PgPool,
}

impl PgNewsletterConfig {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NewsletterConfig for PgNewsletterConfig {
    #[tracing::instrument(name = "Check whether confirmation is required", skip(self))]
    async fn is_confirmation_required(&self, store_id: i64) -> Result<bool, anyhow::Error> {
        let required: Option<bool> =
            sqlx::query_scalar(r#"SELECT newsletter_confirm FROM stores WHERE id = $1"#)
                .bind(store_id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to read the newsletter confirmation setting.")?;
        required.with_context(|| format!("Store {} does not exist.", store_id))
    }
}
