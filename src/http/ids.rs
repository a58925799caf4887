//! Request and correlation identifiers.
//!
//! # Responsibilities
//! - Generate ids (UUID v4 by default, overridable per layer)
//! - Classify inbound requests by [`ScopeType`]
//! - Expose the ids of the current request to handlers ([`RequestIds`])

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, Request, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::config::ScopeType;
use crate::context::{ContextMap, StandardField};

/// Produces a fresh identifier for every call.
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Default generator: a random UUID v4 in hyphenated form.
pub fn uuid_v4() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn default_generator() -> IdGenerator {
    Arc::new(uuid_v4)
}

impl ScopeType {
    /// Classifies `request`: an `Upgrade: websocket` header makes it a
    /// WebSocket exchange, anything else is plain HTTP.
    pub fn of<B>(request: &Request<B>) -> Self {
        let upgrade = request
            .headers()
            .get(header::UPGRADE)
            .and_then(|v| v.to_str().ok());

        match upgrade {
            Some(protocol) if protocol.eq_ignore_ascii_case("websocket") => Self::Websocket,
            _ => Self::Http,
        }
    }
}

/// Ids assigned to the current request by the context middleware.
///
/// Available from request extensions and as an extractor:
///
/// ```rust,no_run
/// use request_context::http::RequestIds;
///
/// async fn handler(ids: RequestIds) -> String {
///     ids.request_id
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequestIds {
    pub request_id: String,
    pub correlation_id: String,
}

impl RequestIds {
    /// Seed values for a new context scope.
    pub fn to_context(&self) -> ContextMap {
        let mut initial = ContextMap::new();
        initial.insert(
            StandardField::RequestId.to_string(),
            Value::String(self.request_id.clone()),
        );
        initial.insert(
            StandardField::CorrelationId.to_string(),
            Value::String(self.correlation_id.clone()),
        );
        initial
    }
}

/// Reads a usable correlation id from `name`: present, visible ASCII and
/// not blank once trimmed.
pub(crate) fn inbound_correlation_id(
    headers: &HeaderMap,
    name: &header::HeaderName,
) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl<S> FromRequestParts<S> for RequestIds
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Self>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Request context middleware is not installed",
        ))
    }
}
