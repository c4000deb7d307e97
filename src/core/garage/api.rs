//! Garage API endpoints
//!
//! - GET /api/cars - Cars of the authenticated user
//! - GET /api/cars/{car_id} - One car, owner only

use axum::{
    Json, Router,
    extract::{Path, State},
    middleware,
    routing::get,
};
use std::sync::Arc;

use crate::core::auth::{AuthError, AuthService, AuthenticatedUser, require_auth};
use crate::core::db::models::{Car, OwnedResource};
use crate::core::db::repositories::GarageStore;
use crate::core::garage::check_owner;

/// Garage API state
#[derive(Clone)]
pub struct GarageApiState {
    pub store: Arc<dyn GarageStore>,
}

/// Create the garage API router; every route requires an access token
pub fn garage_api_router(state: GarageApiState, auth_service: AuthService) -> Router {
    Router::new()
        .route("/api/cars", get(list_cars_handler))
        .route("/api/cars/{car_id}", get(get_car_handler))
        .route_layer(middleware::from_fn_with_state(auth_service, require_auth))
        .with_state(Arc::new(state))
}

/// GET /api/cars
async fn list_cars_handler(
    State(state): State<Arc<GarageApiState>>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Car>>, AuthError> {
    let cars = state.store.list_cars(user.user_id).await?;
    Ok(Json(cars))
}

/// GET /api/cars/{car_id}
async fn get_car_handler(
    State(state): State<Arc<GarageApiState>>,
    user: AuthenticatedUser,
    Path(car_id): Path<i64>,
) -> Result<Json<Car>, AuthError> {
    check_owner(state.store.as_ref(), OwnedResource::Car(car_id), user.user_id).await?;

    // Deleted between the check and the read
    let car = state
        .store
        .find_car(car_id)
        .await?
        .ok_or(AuthError::Forbidden)?;

    Ok(Json(car))
}
