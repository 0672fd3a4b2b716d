//! Per-request sub-containers. The [request_scope] middleware creates a sub-container of the
//! application container for every request and stores it in the request extensions, which act as
//! the carrier of the container for the duration of the request. The sub-container gets deleted,
//! together with its own sub-containers, when the response has been produced. Response bodies
//! streamed after that point must not depend on request-scoped instances.

use axum::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{Extensions, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use scopeline_di::container::Container;
use thiserror::Error;
use tracing::{error, warn};

/// Returns the container carried by given request extensions, if any. This never panics - a
/// missing container means the request didn't pass through the [request_scope] middleware.
pub fn container(extensions: &Extensions) -> Option<Container> {
    extensions.get::<Container>().cloned()
}

/// Returns the container carried by given request, if any.
pub fn container_from_request<B>(request: &Request<B>) -> Option<Container> {
    container(request.extensions())
}

/// Middleware creating a sub-container of the state container for every request.
pub async fn request_scope<B>(
    State(container): State<Container>,
    mut request: Request<B>,
    next: Next<B>,
) -> Response {
    let request_container = match container.sub_container() {
        Ok(request_container) => request_container,
        Err(error) => {
            error!(%error, "Cannot create request container");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    request.extensions_mut().insert(request_container.clone());
    let response = next.run(request).await;

    if let Err(error) = request_container.delete_with_sub_containers() {
        warn!(%error, "Error deleting request container");
    }

    response
}

/// Wraps all routes of given router with the [request_scope] middleware, using given container as
/// the parent of request containers.
pub fn with_request_scope(router: Router, container: Container) -> Router {
    router.layer(middleware::from_fn_with_state(container, request_scope))
}

/// Rejection used when a request carries no container.
#[derive(Error, Clone, Copy, Debug)]
#[error("Request container not found - is the request scope middleware installed?")]
pub struct MissingRequestContainer;

impl IntoResponse for MissingRequestContainer {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// Extractor for the container of the current request.
#[derive(Clone, Debug)]
pub struct RequestContainer(pub Container);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestContainer {
    type Rejection = MissingRequestContainer;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        container(&parts.extensions)
            .map(Self)
            .ok_or(MissingRequestContainer)
    }
}
