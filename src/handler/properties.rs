use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
        ConnectInfo, DefaultBodyLimit, Multipart, Path, Query,
    },
    http::HeaderMap,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    dtos::propertydtos::{
        CreatePropertyDto, ListQueryDto, Pagination, PropertyData, PropertyDto,
        PropertyListData, PropertyListResponseDto, PropertyResponseDto, Response, SearchData,
        SearchPropertyDto, SearchResponseDto, UpdatePropertyDto, ViewData, ViewListResponseDto,
    },
    error::HttpError,
    middleware::{auth, JWTAuthMiddeware},
    models::propertymodel::{ImageSlot, Property},
    service::{error::ServiceError, property_service::ListPage},
    utils::client_ip::client_ip,
    AppState,
};

/// `upload_limit` caps the whole multipart body of an image upload.
pub fn property_handler(upload_limit: usize) -> Router {
    Router::new()
        .route("/all", get(get_all_properties))
        .route(
            "/agents",
            get(get_agent_properties).layer(middleware::from_fn(auth)),
        )
        .route("/details/:slug", get(get_property_details))
        .route(
            "/update/:slug",
            put(update_property).layer(middleware::from_fn(auth)),
        )
        .route(
            "/create",
            post(create_property).layer(middleware::from_fn(auth)),
        )
        .route(
            "/delete/:slug",
            delete(delete_property).layer(middleware::from_fn(auth)),
        )
        .route(
            "/upload-image",
            post(upload_property_images)
                .layer::<_, Infallible>(middleware::from_fn(auth))
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/search", post(search_properties))
        .route("/views", get(get_property_views))
}

fn property_response(property: &Property) -> PropertyResponseDto {
    PropertyResponseDto {
        status: "success".to_string(),
        data: PropertyData {
            property: PropertyDto::from_property(property),
        },
    }
}

fn list_response(page: ListPage) -> PropertyListResponseDto {
    PropertyListResponseDto {
        status: "success".to_string(),
        data: PropertyListData {
            properties: PropertyDto::from_properties(&page.properties),
            pagination: Pagination {
                page: page.page,
                limit: page.limit,
                total: page.total,
            },
        },
    }
}

pub async fn get_all_properties(
    Extension(app_state): Extension<Arc<AppState>>,
    query: Result<Query<ListQueryDto>, QueryRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Query(query) = query.map_err(|e| HttpError::bad_request(e.body_text()))?;

    let page = app_state
        .property_service
        .list_properties(None, &query)
        .await?;

    Ok(Json(list_response(page)))
}

pub async fn get_agent_properties(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    query: Result<Query<ListQueryDto>, QueryRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Query(query) = query.map_err(|e| HttpError::bad_request(e.body_text()))?;

    let page = app_state
        .property_service
        .list_properties(Some(user.user.id), &query)
        .await?;

    Ok(Json(list_response(page)))
}

pub async fn get_property_details(
    Path(slug): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let ip = client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));

    let property = app_state
        .property_service
        .property_detail(&slug, &ip)
        .await?;

    Ok(Json(property_response(&property)))
}

pub async fn create_property(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    body: Result<Json<CreatePropertyDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(body) = body.map_err(|e| HttpError::bad_request(e.body_text()))?;

    let property = app_state
        .property_service
        .create_property(user.user.id, body)
        .await?;

    Ok(Json(property_response(&property)))
}

pub async fn update_property(
    Path(slug): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    body: Result<Json<UpdatePropertyDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(body) = body.map_err(|e| HttpError::bad_request(e.body_text()))?;

    let property = app_state
        .property_service
        .update_property(user.user.id, &slug, body)
        .await?;

    Ok(Json(property_response(&property)))
}

pub async fn delete_property(
    Path(slug): Path<String>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let deleted = app_state
        .property_service
        .delete_property(user.user.id, &slug)
        .await?;

    let body = if deleted {
        json!({ "success": "Deletion was successful" })
    } else {
        json!({ "failure": "Deletion failed" })
    };

    Ok(Json(body))
}

pub async fn upload_property_images(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let mut multipart = multipart.map_err(|e| HttpError::bad_request(e.body_text()))?;

    let mut property_id = None;
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::new(e.body_text(), e.status()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "property_id" {
            let raw = field
                .text()
                .await
                .map_err(|e| HttpError::new(e.body_text(), e.status()))?;
            let id = Uuid::parse_str(raw.trim())
                .map_err(|_| ServiceError::field("property_id", "Must be a valid UUID."))?;
            property_id = Some(id);
            continue;
        }

        // Unknown parts are ignored.
        let Some(slot) = ImageSlot::from_field_name(&name) else {
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| HttpError::new(e.body_text(), e.status()))?;

        // Browsers send an empty part for an untouched file input.
        if data.is_empty() {
            continue;
        }
        uploads.push((slot, data.to_vec()));
    }

    let property_id = property_id
        .ok_or_else(|| ServiceError::field("property_id", "This field is required."))?;

    app_state
        .property_service
        .upload_images(user.user.id, property_id, uploads)
        .await?;

    Ok(Json(Response {
        status: "success",
        message: "Image(s) uploaded".to_string(),
    }))
}

pub async fn search_properties(
    Extension(app_state): Extension<Arc<AppState>>,
    body: Result<Json<SearchPropertyDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(body) = body.map_err(|e| HttpError::bad_request(e.body_text()))?;

    let properties = app_state.property_service.search(body).await?;

    Ok(Json(SearchResponseDto {
        status: "success".to_string(),
        data: SearchData {
            results: properties.len(),
            properties: PropertyDto::from_properties(&properties),
        },
    }))
}

pub async fn get_property_views(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let views = app_state.property_service.list_views().await?;

    Ok(Json(ViewListResponseDto {
        status: "success".to_string(),
        data: ViewData { views },
    }))
}
