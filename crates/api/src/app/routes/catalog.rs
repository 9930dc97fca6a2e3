use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};

use videopalace_core::CatalogItemId;

use crate::app::services::CatalogServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/catalog", get(list_items).post(create_item))
        .route("/catalog/:id", get(get_item))
}

pub async fn create_item(
    Extension(services): Extension<Arc<CatalogServices>>,
    Json(body): Json<dto::CreateCatalogItemRequest>,
) -> axum::response::Response {
    match services.writer.add_item(body.into()).await {
        Ok(item) => {
            let location = format!("/catalog/{}", item.id);
            (
                StatusCode::CREATED,
                [(header::LOCATION, location)],
                Json(dto::CatalogItemResponse::from(item)),
            )
                .into_response()
        }
        Err(e) => errors::catalog_write_error_to_response(e),
    }
}

pub async fn list_items(Extension(services): Extension<Arc<CatalogServices>>) -> axum::response::Response {
    match services.writer.list_items().await {
        Ok(items) => {
            let body: Vec<dto::CatalogItemResponse> = items.into_iter().map(Into::into).collect();
            Json(body).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<CatalogServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match CatalogItemId::from_str(&id) {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.writer.get_item(id).await {
        Ok(Some(item)) => Json(dto::CatalogItemResponse::from(item)).into_response(),
        Ok(None) => errors::not_found(),
        Err(e) => errors::store_error_to_response(e),
    }
}
