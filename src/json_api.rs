use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::ProxyError, state::AppState, translator::EthService, tx::CallParams};

const JSONRPC_VERSION: &str = "2.0";

pub fn routes(ctx: Arc<AppState>) -> Router {
    let cors = cors_layer(ctx.config.cors_origins());

    Router::new()
        .route("/", post(rpc))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}

fn cors_layer(origins: Option<Vec<String>>) -> CorsLayer {
    let allow_origin = match origins {
        Some(origins) => AllowOrigin::list(
            origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(origin) => Some(origin),
                    Err(err) => {
                        tracing::warn!("Ignoring invalid CORS origin {origin}: {err}");
                        None
                    }
                }),
        ),
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[derive(Debug, Deserialize)]
struct RpcRequest {
    method: String,
    #[serde(default)]
    params: Value,
    /// `None` marks a notification; an explicit `null` id is still answered.
    #[serde(default, deserialize_with = "present")]
    id: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

impl RpcResponse {
    fn new(id: Value, res: Result<Value, RpcError>) -> Self {
        let (result, error) = match res {
            Ok(result) => (Some(result), None),
            Err(error) => (None, Some(error)),
        };

        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
            error,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RpcReply {
    Single(RpcResponse),
    Batch(Vec<RpcResponse>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    fn parse_error(err: impl std::fmt::Display) -> Self {
        Self {
            code: -32700,
            message: format!("Parse error: {err}"),
        }
    }

    fn invalid_request(err: impl std::fmt::Display) -> Self {
        Self {
            code: -32600,
            message: format!("Invalid request: {err}"),
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
        }
    }

    fn invalid_params(err: impl std::fmt::Display) -> Self {
        Self {
            code: -32602,
            message: format!("Invalid params: {err}"),
        }
    }

    fn internal(err: impl std::fmt::Display) -> Self {
        Self {
            code: -32603,
            message: format!("Internal error: {err}"),
        }
    }
}

impl From<ProxyError> for RpcError {
    fn from(err: ProxyError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

async fn rpc(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: Value = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!("Malformed JSON-RPC request: {err}");
            return Json(RpcReply::Single(RpcResponse::new(
                Value::Null,
                Err(RpcError::parse_error(err)),
            )))
            .into_response();
        }
    };

    let reply = match request {
        Value::Array(requests) if requests.is_empty() => Some(RpcReply::Single(RpcResponse::new(
            Value::Null,
            Err(RpcError::invalid_request("empty batch")),
        ))),
        Value::Array(requests) => {
            let mut responses = Vec::with_capacity(requests.len());
            for request in requests {
                responses.extend(handle(&state.service, request).await);
            }
            (!responses.is_empty()).then_some(RpcReply::Batch(responses))
        }
        request => handle(&state.service, request).await.map(RpcReply::Single),
    };

    match reply {
        Some(reply) => Json(reply).into_response(),
        // Nothing to answer when every request was a notification.
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Runs one request. Notifications are executed too but get no response.
async fn handle(service: &EthService, request: Value) -> Option<RpcResponse> {
    let request: RpcRequest = match serde_json::from_value(request) {
        Ok(request) => request,
        Err(err) => {
            return Some(RpcResponse::new(
                Value::Null,
                Err(RpcError::invalid_request(err)),
            ))
        }
    };

    let res = dispatch(service, &request.method, request.params).await;
    if let Err(err) = &res {
        tracing::warn!("{} failed: {}", request.method, err.message);
    }

    request.id.map(|id| RpcResponse::new(id, res))
}

pub async fn dispatch(service: &EthService, method: &str, params: Value) -> Result<Value, RpcError> {
    match method {
        "eth_getCode" => {
            let address: String = first_param(params)?;
            to_value(service.get_code(&address).await)
        }
        "eth_call" => {
            let params: CallParams = first_param(params)?;
            to_value(service.call(&params).await)
        }
        "eth_sendTransaction" => {
            let params: CallParams = first_param(params)?;
            to_value(service.send_transaction(&params).await)
        }
        "eth_getTransactionReceipt" => {
            let tx_id: String = first_param(params)?;
            to_value(service.get_transaction_receipt(&tx_id).await)
        }
        "eth_accounts" => to_value(service.accounts().await),
        _ => Err(RpcError::method_not_found(method)),
    }
}

/// Positional parameters; anything after the first (e.g. a block tag) is ignored.
fn first_param<T: DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    let param = match params {
        Value::Array(params) => params
            .into_iter()
            .next()
            .ok_or_else(|| RpcError::invalid_params("expected at least one parameter"))?,
        Value::Null => return Err(RpcError::invalid_params("missing parameters")),
        param => param,
    };

    serde_json::from_value(param).map_err(RpcError::invalid_params)
}

fn to_value<T: Serialize>(res: Result<T, ProxyError>) -> Result<Value, RpcError> {
    serde_json::to_value(res?).map_err(RpcError::internal)
}

#[derive(Serialize)]
struct HealthResponse {
    name: &'static str,
    version: &'static str,
    ledger: &'static str,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        ledger: state.ledger_name,
    })
}
