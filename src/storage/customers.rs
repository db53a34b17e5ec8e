use anyhow::Context;
use sqlx::PgPool;

use crate::{authentication::CustomerToken, domain::SubscriberEmail};

/// 根据 token 找到未注销的客户
#[tracing::instrument(name = "Get customer by token", skip(pool, token))]
pub async fn find_customer_by_token(
    pool: &PgPool,
    token: &CustomerToken,
) -> Result<Option<i64>, anyhow::Error> {
    sqlx::query_scalar(
        r#"SELECT customer_id FROM customer_tokens WHERE token_hash = $1 AND revoked = FALSE"#,
    )
    .bind(token.hash())
    .fetch_optional(pool)
    .await
    .context("Failed to look up the customer token.")
}

#[tracing::instrument(name = "Get customer by email", skip(pool, email))]
pub async fn find_customer_by_email(
    pool: &PgPool,
    email: &SubscriberEmail,
    website_id: i64,
) -> Result<Option<i64>, anyhow::Error> {
    sqlx::query_scalar(r#"SELECT id FROM customers WHERE email = $1 AND website_id = $2"#)
        .bind(email.as_ref())
        .bind(website_id)
        .fetch_optional(pool)
        .await
        .context("Failed to look up the customer by email.")
}
