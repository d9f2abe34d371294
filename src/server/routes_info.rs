use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::error::ApiError;
use super::AppContext;

const INFO_CACHE_CONTROL: &str = "s-maxage=2592000, stale-while-revalidate";

#[derive(Debug, Deserialize)]
pub struct InfoQuery {
    /// Source link
    pub q: Option<String>,
    /// Format selector
    pub f: Option<String>,
}

fn invalid_source() -> ApiError {
    ApiError::Validation(r#"Query parameter "q" must be a valid YouTube URL."#.to_string())
}

/// GET /info - resolve a link into metadata and direct media URLs
pub async fn get_info(
    State(ctx): State<AppContext>,
    query: Result<Query<InfoQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = query.map_err(|_| invalid_source())?;

    let source = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(invalid_source)?;

    if !ctx.extractor.validate_url(source) {
        tracing::warn!(q = %source, "rejected info request for invalid URL");
        return Err(invalid_source());
    }

    let format = ctx.format_or_default(params.f.as_deref());

    tracing::info!(
        url = %source,
        %format,
        extractor = ctx.extractor.name(),
        "fetching info"
    );
    let info = ctx.extractor.extract(source, &format).await?;

    let mut response = Json(info).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(INFO_CACHE_CONTROL),
    );
    Ok(response)
}

/// GET /version - extractor version as plain text
pub async fn get_version(State(ctx): State<AppContext>) -> Result<String, ApiError> {
    Ok(ctx.extractor.version().await?)
}
