use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use shelf::services::{CatalogDescriptor, CatalogFormat, CatalogType, ServiceError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, ApiKeyAuth, AuthContext};
use crate::state::AppState;

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({"message": message}))).into_response()
}

fn service_error_response(err: ServiceError) -> Response {
    match &err {
        ServiceError::InvalidInput(_) | ServiceError::Duplicate(_) => {
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        },
        ServiceError::NotFound(msg) => error_response(StatusCode::NOT_FOUND, msg),
        ServiceError::Storage(_) | ServiceError::Internal(_) => {
            tracing::error!(error = %err, "Catalog operation failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        },
    }
}

fn parse_catalog_type(s: &str) -> Result<CatalogType, Response> {
    s.parse().map_err(|_| {
        error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid catalog type: {}", s),
        )
    })
}

fn parse_catalog_format(catalog_type: CatalogType, s: &str) -> Result<CatalogFormat, Response> {
    s.parse().map_err(|_| {
        error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid {} catalog format: {}", catalog_type, s),
        )
    })
}

#[derive(Default)]
struct UploadForm {
    name: Option<String>,
    format: Option<String>,
    file: Option<Bytes>,
}

async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadForm, Response> {
    fn bad_field(err: impl std::fmt::Display) -> Response {
        error_response(
            StatusCode::BAD_REQUEST,
            &format!("Malformed multipart request: {}", err),
        )
    }

    let mut form = UploadForm::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(bad_field(e)),
        };
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("name") => form.name = Some(field.text().await.map_err(bad_field)?),
            Some("format") => form.format = Some(field.text().await.map_err(bad_field)?),
            Some("file") => form.file = Some(field.bytes().await.map_err(bad_field)?),
            _ => {},
        }
    }
    Ok(form)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// Map of catalog type to its listing endpoint.
async fn all_catalogs() -> impl IntoResponse {
    let mut map = serde_json::Map::new();
    for catalog_type in CatalogType::all() {
        map.insert(
            catalog_type.to_string(),
            serde_json::Value::String(format!("/catalogs/{}/", catalog_type)),
        );
    }
    Json(serde_json::Value::Object(map))
}

async fn list_catalogs(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(catalog_type): Path<String>,
) -> Response {
    let catalog_type = match parse_catalog_type(&catalog_type) {
        Ok(t) => t,
        Err(response) => return response,
    };

    match state.catalogs.list(&auth.owner, catalog_type).await {
        Ok(descriptors) => Json(descriptors).into_response(),
        Err(e) => service_error_response(e),
    }
}

async fn store_catalog(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(catalog_type): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let catalog_type = match parse_catalog_type(&catalog_type) {
        Ok(t) => t,
        Err(response) => return response,
    };
    let form = match read_upload_form(&mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let Some(name) = form.name else {
        return error_response(StatusCode::BAD_REQUEST, "Specify name");
    };
    let Some(format) = form.format else {
        return error_response(StatusCode::BAD_REQUEST, "Specify format");
    };
    let Some(file) = form.file else {
        return error_response(StatusCode::BAD_REQUEST, "Specify file");
    };
    let format = match parse_catalog_format(catalog_type, &format) {
        Ok(f) => f,
        Err(response) => return response,
    };

    match state
        .catalogs
        .create(&auth.owner, catalog_type, &name, format, &file)
        .await
    {
        Ok(record) => {
            let location = format!("/catalogs/{}/{}", record.catalog_type, record.name);
            (
                StatusCode::CREATED,
                [(header::LOCATION, location.clone())],
                Json(serde_json::json!({"location": location})),
            )
                .into_response()
        },
        Err(e) => service_error_response(e),
    }
}

async fn get_catalog(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((catalog_type, name)): Path<(String, String)>,
) -> Response {
    let catalog_type = match parse_catalog_type(&catalog_type) {
        Ok(t) => t,
        Err(response) => return response,
    };

    match state.catalogs.fetch(&auth.owner, catalog_type, &name).await {
        Ok(data) => ([(header::CONTENT_TYPE, "text/plain")], data).into_response(),
        Err(e) => service_error_response(e),
    }
}

async fn update_catalog(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((catalog_type, name)): Path<(String, String)>,
    mut multipart: Multipart,
) -> Response {
    let catalog_type = match parse_catalog_type(&catalog_type) {
        Ok(t) => t,
        Err(response) => return response,
    };
    let form = match read_upload_form(&mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let format = match form.format {
        Some(ref s) => match parse_catalog_format(catalog_type, s) {
            Ok(f) => Some(f),
            Err(response) => return response,
        },
        None => None,
    };

    match state
        .catalogs
        .update(&auth.owner, catalog_type, &name, format, form.file.as_deref())
        .await
    {
        Ok(record) => Json(CatalogDescriptor::from_record(&record)).into_response(),
        Err(e) => service_error_response(e),
    }
}

async fn delete_catalog(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((catalog_type, name)): Path<(String, String)>,
) -> Response {
    let catalog_type = match parse_catalog_type(&catalog_type) {
        Ok(t) => t,
        Err(response) => return response,
    };

    match state.catalogs.delete(&auth.owner, catalog_type, &name).await {
        Ok(()) => Json(serde_json::json!({"message": "deleted"})).into_response(),
        Err(e) => service_error_response(e),
    }
}

pub fn build_router(state: AppState, auth: ApiKeyAuth) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let catalog_routes = Router::new()
        .route("/catalogs/", get(all_catalogs))
        .route(
            "/catalogs/{catalog_type}/",
            get(list_catalogs).post(store_catalog),
        )
        .route(
            "/catalogs/{catalog_type}/{name}",
            get(get_catalog).put(update_catalog).delete(delete_catalog),
        )
        .route_layer(middleware::from_fn(auth_middleware))
        .layer(Extension(auth));

    Router::new()
        .route("/health", get(health))
        .merge(catalog_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
