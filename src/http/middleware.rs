//! Request context middleware.
//!
//! # Responsibilities
//! - Assign a request id (always generated) and a correlation id (inbound
//!   header or generated) to every in-scope request
//! - Open one context scope per request through the configured adapter
//! - Run the handler, and optionally the response body, inside that scope
//! - Echo both ids as response headers
//!
//! # Design Decisions
//! - Inbound request-id headers are ignored so ids cannot be forged
//! - Header values that cannot be encoded are skipped, never fatal
//! - The scope is released through [`ScopeExit`], so error, panic and
//!   cancellation paths exit it exactly once

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::Response;
use axum::Router;

use crate::adapters::{ContextAdapter, ScopeExit};
use crate::config::{RequestContextConfig, ScopeType};
use crate::context::set_adapter;
use crate::error::{Error, Result};
use crate::http::body::ContextBody;
use crate::http::ids::{default_generator, inbound_correlation_id, IdGenerator, RequestIds};

#[derive(Clone)]
struct Settings {
    request_id_header: HeaderName,
    correlation_id_header: HeaderName,
    add_response_headers: bool,
    scope_types: BTreeSet<ScopeType>,
    hold_scope_for_body: bool,
    adapter: Arc<dyn ContextAdapter>,
    request_id_generator: IdGenerator,
    correlation_id_generator: IdGenerator,
}

/// Parsed middleware settings, shared by every request.
///
/// ```rust,no_run
/// use axum::{routing::get, Router};
/// use request_context::http::{RequestContextLayer, RouterContextExt};
///
/// let app: Router = Router::new()
///     .route("/", get(|| async { "ok" }))
///     .with_request_context(RequestContextLayer::new());
/// ```
#[derive(Clone)]
pub struct RequestContextLayer {
    settings: Arc<Settings>,
}

impl RequestContextLayer {
    /// Layer with default headers, UUID v4 ids and the task-local adapter.
    pub fn new() -> Self {
        let defaults = RequestContextConfig::default();
        Self {
            settings: Arc::new(Settings {
                request_id_header: HeaderName::from_static("x-request-id"),
                correlation_id_header: HeaderName::from_static("x-correlation-id"),
                add_response_headers: defaults.add_response_headers,
                scope_types: defaults.scope_types,
                hold_scope_for_body: defaults.hold_scope_for_body,
                adapter: defaults.adapter.build(),
                request_id_generator: default_generator(),
                correlation_id_generator: default_generator(),
            }),
        }
    }

    /// Layer configured from a [`RequestContextConfig`].
    ///
    /// Fails when a configured header name is not a valid HTTP header name.
    pub fn from_config(config: &RequestContextConfig) -> Result<Self> {
        Ok(Self {
            settings: Arc::new(Settings {
                request_id_header: parse_header(&config.request_id_header)?,
                correlation_id_header: parse_header(&config.correlation_id_header)?,
                add_response_headers: config.add_response_headers,
                scope_types: config.scope_types.clone(),
                hold_scope_for_body: config.hold_scope_for_body,
                adapter: config.adapter.build(),
                request_id_generator: default_generator(),
                correlation_id_generator: default_generator(),
            }),
        })
    }

    /// Uses `adapter` instead of the configured built-in one.
    pub fn with_adapter(mut self, adapter: Arc<dyn ContextAdapter>) -> Self {
        Arc::make_mut(&mut self.settings).adapter = adapter;
        self
    }

    /// Overrides how request ids are generated.
    pub fn request_id_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.settings).request_id_generator = Arc::new(generator);
        self
    }

    /// Overrides how correlation ids are generated when none is supplied.
    pub fn correlation_id_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.settings).correlation_id_generator = Arc::new(generator);
        self
    }

    /// The adapter scopes are opened with.
    pub fn adapter(&self) -> Arc<dyn ContextAdapter> {
        Arc::clone(&self.settings.adapter)
    }

    fn assign_ids(&self, headers: &HeaderMap) -> RequestIds {
        let settings = &self.settings;
        let correlation_id = inbound_correlation_id(headers, &settings.correlation_id_header)
            .unwrap_or_else(|| (settings.correlation_id_generator)());

        RequestIds {
            request_id: (settings.request_id_generator)(),
            correlation_id,
        }
    }

    // Replaces any value the handler set, so the echoed ids always match the
    // context the request ran with.
    fn stamp_headers(&self, headers: &mut HeaderMap, ids: &RequestIds) {
        let settings = &self.settings;
        for (name, value) in [
            (&settings.request_id_header, &ids.request_id),
            (&settings.correlation_id_header, &ids.correlation_id),
        ] {
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.insert(name.clone(), value);
                }
                Err(_) => {
                    tracing::warn!(
                        header = %name,
                        value = %value,
                        "Id is not a valid header value, header skipped"
                    );
                }
            }
        }
    }
}

impl Default for RequestContextLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RequestContextLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let settings = &self.settings;
        f.debug_struct("RequestContextLayer")
            .field("request_id_header", &settings.request_id_header)
            .field("correlation_id_header", &settings.correlation_id_header)
            .field("add_response_headers", &settings.add_response_headers)
            .field("scope_types", &settings.scope_types)
            .field("hold_scope_for_body", &settings.hold_scope_for_body)
            .field("adapter", &settings.adapter.name())
            .finish_non_exhaustive()
    }
}

fn parse_header(name: &str) -> Result<HeaderName> {
    HeaderName::try_from(name).map_err(|source| Error::InvalidHeaderName {
        name: name.to_string(),
        source,
    })
}

/// Middleware function; apply with `from_fn_with_state(layer, request_context)`
/// or [`RouterContextExt::with_request_context`].
pub async fn request_context(
    State(layer): State<RequestContextLayer>,
    mut request: Request,
    next: Next,
) -> Response {
    let settings = Arc::clone(&layer.settings);

    let scope_type = ScopeType::of(&request);
    if !settings.scope_types.contains(&scope_type) {
        return next.run(request).await;
    }

    let ids = layer.assign_ids(request.headers());
    request.extensions_mut().insert(ids.clone());

    let scope = settings.adapter.enter_context(ids.to_context());
    let exit = ScopeExit::new(Arc::clone(&settings.adapter), scope.clone());
    tracing::debug!(
        request_id = %ids.request_id,
        correlation_id = %ids.correlation_id,
        scope_type = %scope_type,
        adapter = settings.adapter.name(),
        "Context scope entered"
    );

    let mut response = scope.run(next.run(request)).await;

    if settings.add_response_headers {
        layer.stamp_headers(response.headers_mut(), &ids);
    }

    if settings.hold_scope_for_body {
        response.map(|body| Body::new(ContextBody::new(body, exit)))
    } else {
        exit.exit();
        response
    }
}

/// Extension trait for `axum::`[`Router`] to apply the context middleware.
pub trait RouterContextExt<S> {
    /// Installs the layer's adapter globally and wraps every route in the
    /// request context middleware.
    fn with_request_context(self, layer: RequestContextLayer) -> Self;
}

impl<S> RouterContextExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_request_context(self, layer: RequestContextLayer) -> Self {
        set_adapter(layer.adapter());
        self.layer(from_fn_with_state(layer, request_context))
    }
}
