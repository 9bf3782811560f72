//! Community flagging endpoint.

use crate::error::Result;
use crate::services::ModerationService;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub podcast_id: i32,
    pub flagger: String,
}

/// POST /report-podcast — 409 when the user already flagged this podcast.
pub async fn report_podcast(
    pool: web::Data<PgPool>,
    req: web::Json<ReportRequest>,
) -> Result<HttpResponse> {
    let status = ModerationService::new(pool.get_ref().clone())
        .report(req.podcast_id, &req.flagger)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "status": status,
    })))
}
