use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::Response,
};
use serde::Deserialize;
use tracing::Instrument;
use tubeforged_av::{extract::is_http_url, TranscodePlan};
use uuid::Uuid;

use super::error::ApiError;
use super::AppContext;
use crate::streaming::{disposition, FinalizeSource, ResponseGate, TranscodeJob};

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// Source link
    pub url: Option<String>,
    /// Format selector
    pub f: Option<String>,
}

/// GET /download - stream the source transcoded to MP3 or fragmented MP4
pub async fn get_download(
    State(ctx): State<AppContext>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Response {
    let job_id = Uuid::new_v4();
    let gate = Arc::new(ResponseGate::new(job_id));

    async move {
        match stream_download(&ctx, query, &gate).await {
            Ok(response) => response,
            Err(err) => {
                // The transcoder may already have claimed the outcome.
                gate.finalize(FinalizeSource::Resolver);
                err.into_plain_response()
            }
        }
    }
    .instrument(tracing::info_span!("download", %job_id))
    .await
}

async fn stream_download(
    ctx: &AppContext,
    query: Result<Query<DownloadQuery>, QueryRejection>,
    gate: &Arc<ResponseGate>,
) -> Result<Response, ApiError> {
    let Query(params) = query.map_err(|e| ApiError::Validation(e.body_text()))?;

    let source = params
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| {
            ApiError::Validation("URL parameter is required and cannot be empty".to_string())
        })?;

    if !is_http_url(source) {
        return Err(ApiError::Validation(
            "URL parameter must be an absolute http(s) URL".to_string(),
        ));
    }

    let format = ctx.format_or_default(params.f.as_deref());

    let info = ctx.resolver.fetch(source, &format).await?;
    let plan = TranscodePlan::from_media(&info)?;
    let filename = plan.filename(&ctx.config.transcode.fallback_filename);
    let args = plan.ffmpeg_args(&ctx.config.transcode.settings());

    tracing::info!(
        url = %source,
        kind = ?plan.kind,
        inputs = plan.inputs.len(),
        %filename,
        "starting transcode"
    );
    tracing::debug!(program = %ctx.ffmpeg.display(), ?args, "transcoder arguments");

    let mut job = TranscodeJob::spawn(&ctx.ffmpeg, &args, Arc::clone(gate))
        .map_err(|e| ApiError::ProcessLaunch(e.to_string()))?;

    let first = job
        .first_chunk()
        .await
        .map_err(|e| ApiError::ProcessLaunch(e.to_string()))?;

    gate.mark_headers_sent();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, plan.kind.content_type())
        .header(header::CONTENT_DISPOSITION, disposition::attachment(&filename))
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from_stream(job.into_stream(first)))
        .map_err(|e| ApiError::Unknown(e.to_string()))
}
