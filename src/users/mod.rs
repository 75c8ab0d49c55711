use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::state::AppState;

mod dto;
pub mod handlers;
pub mod repo;
mod repo_types;
pub mod services;
pub mod store;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/userInfo", get(handlers::user_info))
        .route("/updateInfo", put(handlers::update_info))
        .route("/userDelete", delete(handlers::user_delete))
}
