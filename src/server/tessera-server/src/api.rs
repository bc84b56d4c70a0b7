//! The HTTP wire adapter.
//!
//! Speaks the `application/x-amz-json-1.1` convention on a single `POST /`
//! endpoint: the operation is named by the `x-amz-target` header
//! (`TrentService.<Operation>`), the body is the JSON request shape, and
//! failures come back as HTTP 400 with an `{"__type", "message"}` envelope.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::debug;

use tessera_kms::{KmsEngine, KmsError};

const AMZ_JSON: &str = "application/x-amz-json-1.1";
const TARGET_HEADER: &str = "x-amz-target";
const TARGET_PREFIX: &str = "TrentService.";

/// Builds the router for the KMS wire surface.
pub fn router(engine: Arc<KmsEngine>) -> Router {
    Router::new()
        .route("/", any(handle))
        .fallback(unknown_operation)
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

/// A wire-level failure: the error code plus an optional message.
struct ApiError {
    code: &'static str,
    message: Option<String>,
}

impl ApiError {
    fn unknown_operation() -> Self {
        Self {
            code: "UnknownOperationException",
            message: None,
        }
    }

    fn internal(message: String) -> Self {
        Self {
            code: "InternalFailure",
            message: Some(message),
        }
    }
}

impl From<KmsError> for ApiError {
    fn from(err: KmsError) -> Self {
        Self {
            code: err.code(),
            message: Some(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "__type": self.code });
        if let Some(message) = self.message {
            body["message"] = json!(message);
        }
        (
            StatusCode::BAD_REQUEST,
            [(CONTENT_TYPE, AMZ_JSON)],
            body.to_string(),
        )
            .into_response()
    }
}

async fn unknown_operation() -> Response {
    ApiError::unknown_operation().into_response()
}

async fn handle(
    State(engine): State<Arc<KmsEngine>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return ApiError::unknown_operation().into_response();
    }

    let target = headers
        .get(TARGET_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let Some(operation) = target.strip_prefix(TARGET_PREFIX) else {
        return ApiError::unknown_operation().into_response();
    };

    debug!(operation, "Dispatching request");

    match dispatch(&engine, operation, &body) {
        Ok(result) => (StatusCode::OK, [(CONTENT_TYPE, AMZ_JSON)], result).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Routes an operation name to the engine method that handles it.
fn dispatch(engine: &KmsEngine, operation: &str, body: &[u8]) -> Result<Vec<u8>, ApiError> {
    match operation {
        "GenerateRandom" => call(body, |req| engine.generate_random(&req)),

        // Grants.
        "ListGrants" => call(body, |req| engine.list_grants(&req)),
        "ListRetireableGrants" => call(body, |req| engine.list_retireable_grants(&req)),
        "CreateGrant" => call(body, |req| engine.create_grant(&req)),
        "RetireGrant" => call_unit(body, |req| engine.retire_grant(&req)),
        "RevokeGrant" => call_unit(body, |req| engine.revoke_grant(&req)),

        // Tags.
        "ListResourceTags" => call(body, |req| engine.list_resource_tags(&req)),
        "TagResource" => call_unit(body, |req| engine.tag_resource(&req)),
        "UntagResource" => call_unit(body, |req| engine.untag_resource(&req)),

        // Keys.
        "ListKeys" => call(body, |req| engine.list_keys(&req)),
        "CreateKey" => call(body, |req| engine.create_key(&req)),
        "DescribeKey" => call(body, |req| engine.describe_key(&req)),
        "UpdateKeyDescription" => call_unit(body, |req| engine.update_key_description(&req)),
        "EnableKey" => call_unit(body, |req| engine.enable_key(&req)),
        "DisableKey" => call_unit(body, |req| engine.disable_key(&req)),
        "ScheduleKeyDeletion" => call(body, |req| engine.schedule_key_deletion(&req)),
        "CancelKeyDeletion" => call(body, |req| engine.cancel_key_deletion(&req)),

        // Rotation.
        "GetKeyRotationStatus" => call(body, |req| engine.get_key_rotation_status(&req)),
        "EnableKeyRotation" => call_unit(body, |req| engine.enable_key_rotation(&req)),
        "DisableKeyRotation" => call_unit(body, |req| engine.disable_key_rotation(&req)),

        // Policies.
        "ListKeyPolicies" => call(body, |req| engine.list_key_policies(&req)),
        "GetKeyPolicy" => call(body, |req| engine.get_key_policy(&req)),
        "PutKeyPolicy" => call_unit(body, |req| engine.put_key_policy(&req)),

        // Aliases.
        "ListAliases" => call(body, |req| engine.list_aliases(&req)),
        "CreateAlias" => call_unit(body, |req| engine.create_alias(&req)),
        "UpdateAlias" => call_unit(body, |req| engine.update_alias(&req)),
        "DeleteAlias" => call_unit(body, |req| engine.delete_alias(&req)),

        // Crypto.
        "GenerateDataKey" => call(body, |req| engine.generate_data_key(&req)),
        "GenerateDataKeyWithoutPlaintext" => {
            call(body, |req| engine.generate_data_key_without_plaintext(&req))
        }
        "Encrypt" => call(body, |req| engine.encrypt(&req)),
        "Decrypt" => call(body, |req| engine.decrypt(&req)),
        "ReEncrypt" => call(body, |req| engine.re_encrypt(&req)),

        _ => Err(ApiError::unknown_operation()),
    }
}

/// Decodes the request, runs the operation, and encodes its result.
fn call<Req, Res>(
    body: &[u8],
    operation: impl FnOnce(Req) -> Result<Res, KmsError>,
) -> Result<Vec<u8>, ApiError>
where
    Req: DeserializeOwned,
    Res: Serialize,
{
    let req = parse(body)?;
    let result = operation(req)?;
    serde_json::to_vec(&result).map_err(|e| ApiError::internal(e.to_string()))
}

/// Like [`call`], for operations whose success response has no body.
fn call_unit<Req>(
    body: &[u8],
    operation: impl FnOnce(Req) -> Result<(), KmsError>,
) -> Result<Vec<u8>, ApiError>
where
    Req: DeserializeOwned,
{
    let req = parse(body)?;
    operation(req)?;
    Ok(Vec::new())
}

fn parse<Req: DeserializeOwned>(body: &[u8]) -> Result<Req, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::internal(e.to_string()))
}
