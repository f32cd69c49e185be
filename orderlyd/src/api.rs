//! HTTP API for the Orderly daemon.
//!
//! Provides REST endpoints for:
//! - Health check
//! - Registration and login
//! - Order creation, listing, lookup, advancement and soft delete

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::debug;

use orderly_domain::{Credentials, NewOrder, Order, OrderId, OrderState};
use orderly_engine::{AuthEngine, AuthSession, EngineError, OrderEngine, OrderPage, OrderQuery};
use orderly_store::Store;

use crate::auth::{require_auth, CurrentUser};
use crate::config::Environment;
use crate::error::ApiError;

// =============================================================================
// API State
// =============================================================================

/// Shared state for API handlers.
pub struct ApiState<S: Store + 'static> {
    /// Registration, login and token verification
    pub auth: AuthEngine<S>,
    /// Order lifecycle
    pub orders: OrderEngine<S>,
    /// Backing store, checked by `/health`
    pub store: Arc<S>,
    /// Decides whether error bodies carry a stack
    pub environment: Environment,
}

impl<S: Store + 'static> ApiState<S> {
    fn engine_error(&self, err: EngineError) -> ApiError {
        ApiError::from_engine(err, self.environment)
    }

    fn rejection(&self, message: String, detail: String) -> ApiError {
        ApiError::bad_request(message).with_stack(self.environment, detail)
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `unhealthy`
    pub status: String,
    /// Crate version
    pub version: String,
}

/// Query string of `GET /orders`.
#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersParams {
    /// 1-based page number
    pub page: Option<i64>,
    /// Page size
    pub limit: Option<i64>,
    /// Workflow state name, e.g. `ANALYSIS`
    pub state: Option<String>,
}

impl ListOrdersParams {
    fn into_query(self) -> Result<OrderQuery, EngineError> {
        let state = match self.state.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<OrderState>()?),
        };

        Ok(OrderQuery {
            page: self.page,
            limit: self.limit,
            state,
        })
    }
}

// =============================================================================
// Router
// =============================================================================

/// Create the API router.
///
/// Every route except `/health` is mounted under `prefix` (empty for root).
pub fn create_router<S: Store + 'static>(state: Arc<ApiState<S>>, prefix: &str) -> Router {
    let orders = Router::new()
        .route("/orders", post(create_order_handler::<S>).get(list_orders_handler::<S>))
        .route("/orders/:id", get(get_order_handler::<S>).delete(delete_order_handler::<S>))
        .route("/orders/:id/advance", patch(advance_order_handler::<S>))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth::<S>));

    let api = Router::new()
        .route("/auth/register", post(register_handler::<S>))
        .route("/auth/login", post(login_handler::<S>))
        .merge(orders);

    let router = Router::new().route("/health", get(health_handler::<S>));
    let router = if prefix.is_empty() {
        router.merge(api)
    } else {
        router.nest(prefix, api)
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
async fn health_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (code, status) = match state.store.health_check().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        },
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Register a new user.
async fn register_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthSession>), ApiError> {
    let Json(credentials) = body.map_err(|e| json_error(&state, e))?;

    let session = state
        .auth
        .register(&credentials)
        .await
        .map_err(|e| state.engine_error(e))?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Log in with email and password.
async fn login_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthSession>, ApiError> {
    let Json(credentials) = body.map_err(|e| json_error(&state, e))?;

    let session = state
        .auth
        .login(&credentials)
        .await
        .map_err(|e| state.engine_error(e))?;

    Ok(Json(session))
}

/// Create an order.
async fn create_order_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    body: Result<Json<NewOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let Json(input) = body.map_err(|e| json_error(&state, e))?;

    let order = state
        .orders
        .create_order(input)
        .await
        .map_err(|e| state.engine_error(e))?;

    debug!(%user_id, order_id = %order.id, "Create order request served");
    Ok((StatusCode::CREATED, Json(order)))
}

/// List active orders.
async fn list_orders_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    params: Result<Query<ListOrdersParams>, QueryRejection>,
) -> Result<Json<OrderPage>, ApiError> {
    let Query(params) = params
        .map_err(|e| state.rejection(e.body_text(), format!("{:?}", e)))?;
    let query = params.into_query().map_err(|e| state.engine_error(e))?;

    let page = state
        .orders
        .get_orders(query)
        .await
        .map_err(|e| state.engine_error(e))?;

    Ok(Json(page))
}

/// Get one order.
async fn get_order_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    id: Result<Path<OrderId>, PathRejection>,
) -> Result<Json<Order>, ApiError> {
    let id = order_id(&state, id)?;

    let order = state
        .orders
        .get_order(id)
        .await
        .map_err(|e| state.engine_error(e))?;

    Ok(Json(order))
}

/// Advance an order one workflow step.
async fn advance_order_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    id: Result<Path<OrderId>, PathRejection>,
) -> Result<Json<Order>, ApiError> {
    let id = order_id(&state, id)?;

    let order = state
        .orders
        .advance_order_state(id)
        .await
        .map_err(|e| state.engine_error(e))?;

    debug!(%user_id, order_id = %id, state = %order.state, "Advance request served");
    Ok(Json(order))
}

/// Soft-delete an order.
async fn delete_order_handler<S: Store + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    id: Result<Path<OrderId>, PathRejection>,
) -> Result<Json<Order>, ApiError> {
    let id = order_id(&state, id)?;

    let order = state
        .orders
        .delete_order(id)
        .await
        .map_err(|e| state.engine_error(e))?;

    debug!(%user_id, order_id = %id, "Delete request served");
    Ok(Json(order))
}

// =============================================================================
// Helpers
// =============================================================================

fn json_error<S: Store + 'static>(state: &ApiState<S>, rejection: JsonRejection) -> ApiError {
    state.rejection(rejection.body_text(), format!("{:?}", rejection))
}

fn order_id<S: Store + 'static>(
    state: &ApiState<S>,
    id: Result<Path<OrderId>, PathRejection>,
) -> Result<OrderId, ApiError> {
    id.map(|Path(id)| id)
        .map_err(|e| state.rejection("Invalid order id".to_string(), e.body_text()))
}

// =============================================================================
// Tests
// =============================================================================
