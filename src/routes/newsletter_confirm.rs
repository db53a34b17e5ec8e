use actix_web::{HttpResponse, ResponseError, http::StatusCode, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::{
    domain::ConfirmationCode,
    storage::{confirm_subscriber, get_pending_subscriber},
    subscription::StatusChangeNotifier,
    utils::error_chain_fmt,
};

#[derive(Debug, Deserialize)]
pub struct Parameters {
    id: uuid::Uuid,
    code: String,
}

#[derive(thiserror::Error)]
pub enum ConfirmError {
    #[error("{0}")]
    ValidationError(String),
    #[error("This confirmation link is invalid or has already been used.")]
    UnknownConfirmation,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for ConfirmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ConfirmError {
    fn status_code(&self) -> StatusCode {
        match self {
            ConfirmError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ConfirmError::UnknownConfirmation => StatusCode::UNAUTHORIZED,
            ConfirmError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// `GET /newsletter/confirm?id=..&code=..`
///
/// 确认邮件中的链接,把等待确认的订阅者改为已订阅
#[tracing::instrument(name = "Confirm a pending newsletter subscriber", skip(parameters, pool, notifier))]
pub async fn confirm(
    parameters: web::Query<Parameters>,
    pool: web::Data<PgPool>,
    notifier: web::Data<dyn StatusChangeNotifier>,
) -> Result<HttpResponse, ConfirmError> {
    let code =
        ConfirmationCode::parse(parameters.code.clone()).map_err(ConfirmError::ValidationError)?;
    let subscriber = get_pending_subscriber(&pool, parameters.id, &code)
        .await?
        .ok_or(ConfirmError::UnknownConfirmation)?;

    // 同一链接被并发点击时只有一次能更新成功
    let subscriber = confirm_subscriber(&pool, subscriber.id)
        .await?
        .ok_or(ConfirmError::UnknownConfirmation)?;

    // 状态已经保存,邮件发送失败不影响确认结果
    if let Err(e) = notifier.notify_status_change(&subscriber).await {
        tracing::warn!(
            error.cause_chain = ?e,
            "Failed to send the subscription success email"
        );
    }
    Ok(HttpResponse::Ok().finish())
}
