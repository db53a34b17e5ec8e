mod operation;

pub use operation::{OperationError, SUBSCRIBE_FIELD, SubscribeMutation, parse_subscribe_mutation};

use actix_web::{HttpRequest, HttpResponse, http::StatusCode, web};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::context::{ContextError, DefaultStoreCode, resolve_caller_context};
use crate::subscription::{SubscribeEmailToNewsletter, SubscribeError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub query: String,
    #[serde(default)]
    pub variables: serde_json::Value,
    #[serde(default)]
    pub operation_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GraphQlResponse {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQlError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct GraphQlError {
    pub message: String,
    pub extensions: ErrorExtensions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ErrorExtensions {
    pub category: &'static str,
}

impl GraphQlResponse {
    fn request_error(message: String, category: &'static str) -> Self {
        Self {
            errors: vec![GraphQlError {
                message,
                extensions: ErrorExtensions { category },
                path: None,
            }],
            data: None,
        }
    }

    /// 字段解析失败时 `data` 中对应的键为 null
    fn field_error(response_key: String, error: &SubscribeError) -> Self {
        Self {
            errors: vec![GraphQlError {
                message: error.to_string(),
                extensions: ErrorExtensions {
                    category: error.category(),
                },
                path: Some(vec![response_key.clone()]),
            }],
            data: Some(serde_json::json!({ response_key: null })),
        }
    }
}

impl From<&OperationError> for GraphQlResponse {
    fn from(e: &OperationError) -> Self {
        GraphQlResponse::request_error(e.to_string(), "graphql")
    }
}

impl From<&ContextError> for GraphQlResponse {
    fn from(e: &ContextError) -> Self {
        GraphQlResponse::request_error(e.to_string(), e.category())
    }
}

/// `POST /graphql`
///
/// 字段级别的失败按 GraphQL 约定返回 200 和 `errors`;
/// 请求本身无法执行时 (语法错误、未授权、店铺不存在) 返回 4xx
#[tracing::instrument(
    name = "Resolving a GraphQL request",
    skip(body, request, pool, default_store, handler),
    fields(operation_name = ?body.operation_name)
)]
pub async fn graphql(
    body: web::Json<GraphQlRequest>,
    request: HttpRequest,
    pool: web::Data<PgPool>,
    default_store: web::Data<DefaultStoreCode>,
    handler: web::Data<SubscribeEmailToNewsletter>,
) -> HttpResponse {
    let mutation = match parse_subscribe_mutation(
        &body.query,
        body.operation_name.as_deref(),
        &body.variables,
    ) {
        Ok(mutation) => mutation,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected GraphQL document");
            return HttpResponse::BadRequest().json(GraphQlResponse::from(&e));
        }
    };

    let context = match resolve_caller_context(&request, &pool, &default_store).await {
        Ok(context) => context,
        Err(e) => {
            if e.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
                tracing::error!(error.cause_chain = ?e, "Failed to resolve the caller context");
            }
            return HttpResponse::build(e.status_code()).json(GraphQlResponse::from(&e));
        }
    };

    match handler.execute(mutation.email.as_deref(), &context).await {
        Ok(outcome) => HttpResponse::Ok().json(GraphQlResponse {
            errors: vec![],
            data: Some(serde_json::json!({ mutation.response_key: outcome })),
        }),
        Err(e) => HttpResponse::Ok().json(GraphQlResponse::field_error(mutation.response_key, &e)),
    }
}
