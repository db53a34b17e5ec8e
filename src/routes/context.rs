use actix_web::{HttpRequest, http::StatusCode};
use sqlx::PgPool;

use crate::{
    authentication::bearer_token,
    domain::CallerContext,
    storage::{find_customer_by_token, find_store_by_code},
    utils::error_chain_fmt,
};

/// 请求没有带 `Store` 头时使用的店铺代码
pub struct DefaultStoreCode(pub String);

#[derive(thiserror::Error)]
pub enum ContextError {
    #[error("The current customer isn't authorized.")]
    Unauthorized(#[source] anyhow::Error),
    #[error("Requested store is not found")]
    StoreNotFound(String),
    #[error("Internal server error")]
    Unexpected(#[from] anyhow::Error),
}

impl std::fmt::Debug for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ContextError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ContextError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ContextError::StoreNotFound(_) => StatusCode::BAD_REQUEST,
            ContextError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            ContextError::Unauthorized(_) => "graphql-authorization",
            ContextError::StoreNotFound(_) => "graphql-no-such-entity",
            ContextError::Unexpected(_) => "internal",
        }
    }
}

/// 从 `Authorization` 和 `Store` 请求头得到调用方信息
#[tracing::instrument(name = "Resolving caller context", skip(request, pool, default_store))]
pub async fn resolve_caller_context(
    request: &HttpRequest,
    pool: &PgPool,
    default_store: &DefaultStoreCode,
) -> Result<CallerContext, ContextError> {
    let customer_id = match bearer_token(request.headers()).map_err(ContextError::Unauthorized)? {
        Some(token) => {
            let customer_id = find_customer_by_token(pool, &token).await?.ok_or_else(|| {
                ContextError::Unauthorized(anyhow::anyhow!("Unknown or revoked customer token."))
            })?;
            Some(customer_id)
        }
        None => None,
    };

    let store_code = match request.headers().get("Store") {
        Some(value) => value
            .to_str()
            .map_err(|_| ContextError::StoreNotFound("<invalid>".into()))?
            .trim()
            .to_string(),
        None => default_store.0.clone(),
    };
    let store = find_store_by_code(pool, &store_code)
        .await
        .map_err(|e| ContextError::Unexpected(e.into()))?
        .ok_or(ContextError::StoreNotFound(store_code))?;

    Ok(CallerContext {
        customer_id,
        store_id: store.id,
        website_id: store.website_id,
    })
}
