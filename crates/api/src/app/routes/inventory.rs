use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use tracing::info;

use videopalace_core::InventoryRecordId;
use videopalace_infra::EntityStore;
use videopalace_inventory::InventoryRecord;

use crate::app::services::InventoryServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/inventory", get(list_records).post(create_record))
        .route("/inventory/:id", get(get_record))
}

/// Direct-create: stock is taken from the request (`available = total`). No
/// duplicate check on `sourceId`.
pub async fn create_record(
    Extension(services): Extension<Arc<InventoryServices>>,
    Json(body): Json<dto::CreateInventoryRecordRequest>,
) -> axum::response::Response {
    let record = match InventoryRecord::create(body.into(), Utc::now()) {
        Ok(record) => record,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if let Err(e) = services.store.create(record.clone()).await {
        return errors::store_error_to_response(e);
    }
    info!(record_id = %record.id, source_id = %record.source_id, "inventory record created directly");

    let location = format!("/inventory/{}", record.id);
    (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(dto::InventoryRecordResponse::from(record)),
    )
        .into_response()
}

pub async fn list_records(Extension(services): Extension<Arc<InventoryServices>>) -> axum::response::Response {
    match services.store.get_all().await {
        Ok(records) => {
            let body: Vec<dto::InventoryRecordResponse> = records.into_iter().map(Into::into).collect();
            Json(body).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_record(
    Extension(services): Extension<Arc<InventoryServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match InventoryRecordId::from_str(&id) {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store.get(id).await {
        Ok(Some(record)) => Json(dto::InventoryRecordResponse::from(record)).into_response(),
        Ok(None) => errors::not_found(),
        Err(e) => errors::store_error_to_response(e),
    }
}
