use actix_web::{
    get,
    web::{self, Query},
    HttpResponse, Responder,
};
use serde::Deserialize;
use tracing::info;

use crate::app_state::AppState;
use crate::clip::ContainerFormat;
use crate::endpoints::error_response;

#[derive(Deserialize)]
pub struct SilenceQuery {
    /// Seconds of silence. Negative values give an empty payload.
    pub duration: f64,
    /// `wav` (default) or `mp3`.
    #[serde(default)]
    pub format: Option<String>,
}

/// GET /silence?duration=1.5&format=mp3
#[get("/silence")]
pub async fn get_silence(state: web::Data<AppState>, query: Query<SilenceQuery>) -> impl Responder {
    info!(
        "GET /silence endpoint called: duration={} format={:?}",
        query.duration, query.format
    );

    let format = query
        .format
        .as_deref()
        .map_or(ContainerFormat::Wav, ContainerFormat::from_label);

    match state.composer.silence(query.duration, &format) {
        Ok(clip) => HttpResponse::Ok()
            .content_type(format.mime_type())
            .body(clip.bytes().to_vec()),
        Err(e) => {
            info!("Silence synthesis failed: {}", e);
            error_response(&e)
        }
    }
}
