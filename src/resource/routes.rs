use axum::{Router, extract::State, routing::get};

use super::handler::{self, Id, Payload};
use crate::handler::AppState;
use crate::model::ResourceDescriptor;

/// Collection and item endpoints for one resource, relative to its mount
/// point: `GET|POST /` and `GET|PATCH|DELETE /:id`.
pub fn routes(descriptor: &'static ResourceDescriptor) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(move |State(state): State<AppState>| handler::list(state, descriptor)).post(
                move |State(state): State<AppState>, body: Payload| handler::create(state, descriptor, body),
            ),
        )
        .route(
            "/:id",
            get(move |State(state): State<AppState>, id: Id| handler::get(state, descriptor, id))
                .patch(move |State(state): State<AppState>, id: Id, body: Payload| {
                    handler::update(state, descriptor, id, body)
                })
                .delete(move |State(state): State<AppState>, id: Id| handler::delete(state, descriptor, id)),
        )
}
