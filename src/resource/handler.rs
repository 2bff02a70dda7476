//! HTTP handlers shared by every resource in the catalog.

use axum::{
    Json,
    extract::{
        Path,
        rejection::{JsonRejection, PathRejection},
    },
    response::Response,
};

use super::ResourceAccessor;
use crate::api::{created, no_content, success};
use crate::error::ResourceError;
use crate::handler::AppState;
use crate::model::{Record, ResourceDescriptor};

pub type Payload = Result<Json<Record>, JsonRejection>;
pub type Id = Result<Path<i64>, PathRejection>;

fn payload(payload: Payload) -> Result<Record, ResourceError> {
    payload
        .map(|Json(record)| record)
        .map_err(|e| ResourceError::InvalidArgument(e.body_text()))
}

fn id(id: Id) -> Result<i64, ResourceError> {
    id.map(|Path(id)| id)
        .map_err(|_| ResourceError::InvalidArgument("id must be an integer".to_string()))
}

pub async fn list(state: AppState, descriptor: &'static ResourceDescriptor) -> Result<Response, ResourceError> {
    let lib = ResourceAccessor::new(&state.db);
    let records = lib.list(descriptor).await?;
    Ok(success(records))
}

pub async fn get(state: AppState, descriptor: &'static ResourceDescriptor, id_param: Id) -> Result<Response, ResourceError> {
    let lib = ResourceAccessor::new(&state.db);
    let record = lib.get_by_id(descriptor, id(id_param)?).await?;
    Ok(success(record))
}

pub async fn create(state: AppState, descriptor: &'static ResourceDescriptor, body: Payload) -> Result<Response, ResourceError> {
    let fields = payload(body)?;
    let lib = ResourceAccessor::new(&state.db);
    let record = lib.create(descriptor, &fields).await?;
    Ok(created(record))
}

pub async fn update(
    state: AppState,
    descriptor: &'static ResourceDescriptor,
    id_param: Id,
    body: Payload,
) -> Result<Response, ResourceError> {
    let id = id(id_param)?;
    let fields = payload(body)?;
    let lib = ResourceAccessor::new(&state.db);
    let record = lib.update(descriptor, id, &fields).await?;
    Ok(success(record))
}

pub async fn delete(state: AppState, descriptor: &'static ResourceDescriptor, id_param: Id) -> Result<Response, ResourceError> {
    let lib = ResourceAccessor::new(&state.db);
    lib.delete(descriptor, id(id_param)?).await?;
    Ok(no_content())
}
