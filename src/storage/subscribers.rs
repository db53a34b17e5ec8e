use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    domain::{ConfirmationCode, Subscriber, SubscriberEmail, SubscriptionStatus},
    subscription::SubscriberRepository,
};

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    email: String,
    store_id: i64,
    website_id: i64,
    customer_id: Option<i64>,
    status: String,
    confirmation_code: String,
    status_changed_at: DateTime<Utc>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = anyhow::Error;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        Ok(Subscriber {
            id: row.id,
            email: SubscriberEmail::parse(row.email).map_err(|e| anyhow::anyhow!(e))?,
            status: SubscriptionStatus::try_from(row.status).map_err(|e| anyhow::anyhow!(e))?,
            store_id: row.store_id,
            website_id: row.website_id,
            customer_id: row.customer_id,
            confirmation_code: ConfirmationCode::parse(row.confirmation_code)
                .map_err(|e| anyhow::anyhow!(e))?,
            status_changed_at: row.status_changed_at,
        })
    }
}

pub struct PgSubscriberRepository {
    pool: PgPool,
}

impl PgSubscriberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriberRepository for PgSubscriberRepository {
    /// 同一网站下邮箱已存在时更新原记录,保留原来的 id
    #[tracing::instrument(
        name = "Saving newsletter subscriber",
        skip(self, subscriber),
        fields(status = subscriber.status.as_str())
    )]
    async fn save(&self, subscriber: &Subscriber) -> Result<Subscriber, anyhow::Error> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            r#"INSERT INTO newsletter_subscribers
                (id, email, store_id, website_id, customer_id, status, confirmation_code, status_changed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (email, website_id) DO UPDATE SET
                store_id = EXCLUDED.store_id,
                customer_id = COALESCE(EXCLUDED.customer_id, newsletter_subscribers.customer_id),
                status = EXCLUDED.status,
                confirmation_code = EXCLUDED.confirmation_code,
                status_changed_at = EXCLUDED.status_changed_at
            RETURNING id, email, store_id, website_id, customer_id, status, confirmation_code, status_changed_at
            "#,
        )
        .bind(subscriber.id)
        .bind(subscriber.email.as_ref())
        .bind(subscriber.store_id)
        .bind(subscriber.website_id)
        .bind(subscriber.customer_id)
        .bind(subscriber.status.as_str())
        .bind(subscriber.confirmation_code.as_ref())
        .bind(subscriber.status_changed_at)
        .fetch_one(&self.pool)
        .await
        .context("Failed to upsert the newsletter subscriber.")?;

        row.try_into()
    }
}

#[tracing::instrument(name = "Get subscriber status", skip(pool, email))]
pub async fn find_subscriber_status(
    pool: &PgPool,
    email: &SubscriberEmail,
    website_id: i64,
) -> Result<Option<SubscriptionStatus>, anyhow::Error> {
    let status: Option<String> = sqlx::query_scalar(
        r#"SELECT status FROM newsletter_subscribers WHERE email = $1 AND website_id = $2"#,
    )
    .bind(email.as_ref())
    .bind(website_id)
    .fetch_optional(pool)
    .await
    .context("Failed to read the subscriber status.")?;

    status
        .map(SubscriptionStatus::try_from)
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))
}

/// 找到 id 和确认码都匹配、且仍在等待确认的订阅者
#[tracing::instrument(name = "Get subscriber pending confirmation", skip(pool, code))]
pub async fn get_pending_subscriber(
    pool: &PgPool,
    subscriber_id: Uuid,
    code: &ConfirmationCode,
) -> Result<Option<Subscriber>, anyhow::Error> {
    let row = sqlx::query_as::<_, SubscriberRow>(
        r#"SELECT id, email, store_id, website_id, customer_id, status, confirmation_code, status_changed_at
        FROM newsletter_subscribers
        WHERE id = $1 AND confirmation_code = $2 AND status = $3"#,
    )
    .bind(subscriber_id)
    .bind(code.as_ref())
    .bind(SubscriptionStatus::NotActive.as_str())
    .fetch_optional(pool)
    .await
    .context("Failed to look up the subscriber pending confirmation.")?;

    row.map(Subscriber::try_from).transpose()
}

/// 只会更新仍在等待确认的订阅者;已经被确认过时返回 `None`
#[tracing::instrument(name = "Mark subscriber as subscribed", skip(pool))]
pub async fn confirm_subscriber(
    pool: &PgPool,
    subscriber_id: Uuid,
) -> Result<Option<Subscriber>, anyhow::Error> {
    let row = sqlx::query_as::<_, SubscriberRow>(
        r#"UPDATE newsletter_subscribers
        SET status = $2, status_changed_at = $3
        WHERE id = $1 AND status = $4
        RETURNING id, email, store_id, website_id, customer_id, status, confirmation_code, status_changed_at"#,
    )
    .bind(subscriber_id)
    .bind(SubscriptionStatus::Subscribed.as_str())
    .bind(Utc::now())
    .bind(SubscriptionStatus::NotActive.as_str())
    .fetch_optional(pool)
    .await
    .context("Failed to confirm the subscriber.")?;

    row.map(Subscriber::try_from).transpose()
}
