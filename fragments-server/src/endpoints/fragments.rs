use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Router, routing};
use bytes::Bytes;
use fragments_service::{Fragment, FragmentInit, FragmentList};
use fragments_types::media::{APPLICATION_JSON, MediaType};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::endpoints::common::{ApiError, ApiResult, success};
use crate::extractors::Owner;
use crate::state::ServiceState;

pub fn router() -> Router<ServiceState> {
    Router::new()
        .route(
            "/fragments",
            routing::get(fragments_get).post(fragments_post),
        )
        .route(
            "/fragments/{id}",
            routing::get(fragment_get).delete(fragment_delete),
        )
        .route("/fragments/{id}/info", routing::get(fragment_info))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    expand: Option<String>,
}

/// Response returned when listing fragments.
#[derive(Debug, Serialize)]
struct ListResponse {
    fragments: FragmentList,
}

/// Response carrying the metadata of a single fragment.
#[derive(Debug, Serialize)]
struct FragmentResponse {
    fragment: Fragment,
}

async fn fragments_get(
    owner: Owner,
    State(state): State<ServiceState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let expand = query.expand.as_deref() == Some("1");
    let fragments = Fragment::by_user(&state.store, owner.as_str(), expand).await?;
    Ok(success(ListResponse { fragments }))
}

async fn fragments_post(
    owner: Owner,
    State(state): State<ServiceState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Response> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .ok_or_else(|| ApiError::BadRequest("Content-Type header is required".into()))?
        .to_str()
        .map_err(|_| ApiError::BadRequest("invalid Content-Type".into()))?;

    let media_type = MediaType::parse(content_type)
        .map_err(|err| ApiError::BadRequest(format!("invalid Content-Type: {err}")))?;
    if !media_type.is_supported() {
        return Err(ApiError::UnsupportedMediaType(format!(
            "unsupported content type: {}",
            media_type.base_type()
        )));
    }

    let data = body?;
    let init = FragmentInit::new(owner.0, media_type.as_str());
    let mut fragment = Fragment::new(&state.store, init)?;
    fragment.set_data(data).await?;

    tracing::info!(
        owner_id = fragment.owner_id(),
        id = fragment.id(),
        size = fragment.size(),
        "fragment created"
    );

    let location = location(&state.config, &headers, fragment.id());
    let response = (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        success(FragmentResponse { fragment }),
    );

    Ok(response.into_response())
}

/// Serves `/fragments/{id}` and `/fragments/{id}.{ext}`.
async fn fragment_get(
    owner: Owner,
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    match id.rsplit_once('.') {
        Some((id, ext)) if !id.is_empty() => fragment_get_converted(&state, &owner, id, ext).await,
        _ => fragment_get_raw(&state, &owner, &id).await,
    }
}

async fn fragment_get_raw(state: &ServiceState, owner: &Owner, id: &str) -> ApiResult<Response> {
    let fragment = Fragment::by_id(&state.store, owner.as_str(), id).await?;
    let data = fragment.get_data().await?.unwrap_or_default();

    let content_type = response_content_type(fragment.media_type());
    Ok(([(header::CONTENT_TYPE, content_type)], data).into_response())
}

async fn fragment_get_converted(
    state: &ServiceState,
    owner: &Owner,
    id: &str,
    ext: &str,
) -> ApiResult<Response> {
    let extension = format!(".{ext}");
    let Some(target) = Fragment::mime_type_for_extension(&extension) else {
        return Err(ApiError::UnsupportedMediaType(format!(
            "unsupported file extension: {extension}"
        )));
    };

    let fragment = Fragment::by_id(&state.store, owner.as_str(), id).await?;
    let data = fragment.get_data().await?.unwrap_or_default();
    let converted = fragment.convert_data(data, target)?;

    let target = MediaType::parse(target).map_err(fragments_service::Error::from)?;
    let content_type = response_content_type(&target);
    Ok(([(header::CONTENT_TYPE, content_type)], converted).into_response())
}

async fn fragment_info(
    owner: Owner,
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let fragment = Fragment::by_id(&state.store, owner.as_str(), &id).await?;
    Ok(success(FragmentResponse { fragment }))
}

async fn fragment_delete(
    owner: Owner,
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    // Deleting is idempotent in the store, but the API reports unknown fragments.
    Fragment::by_id(&state.store, owner.as_str(), &id).await?;
    Fragment::delete(&state.store, owner.as_str(), &id).await?;

    tracing::info!(owner_id = owner.as_str(), id = %id, "fragment deleted");
    Ok(success(serde_json::Map::new()))
}

/// Returns the `Content-Type` to serve data of the given type with.
///
/// Text and JSON are always served with a charset, defaulting to UTF-8.
fn response_content_type(media_type: &MediaType) -> String {
    let needs_charset = media_type.is_text() || media_type.base_type() == APPLICATION_JSON;
    if needs_charset && media_type.charset().is_none() {
        format!("{media_type}; charset=utf-8")
    } else {
        media_type.to_string()
    }
}

/// Returns the URL of a fragment for the `Location` header.
fn location(config: &Config, headers: &HeaderMap, id: &str) -> String {
    let base = match config.api_url {
        Some(ref api_url) => api_url.trim_end_matches('/').to_owned(),
        None => {
            let host = headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("localhost");
            format!("http://{host}")
        }
    };

    format!("{base}/v1/fragments/{id}")
}
