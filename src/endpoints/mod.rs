use actix_web::{web::ServiceConfig, HttpResponse};
use serde_json::json;

use crate::error::CompositionError;

pub mod compose;
pub mod silence;

/// Register every composer route. Mounted under `/api` by `main`.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(compose::post_compose)
        .service(silence::get_silence);
}

/// JSON error body for a failed composition.
///
/// Caller mistakes are 400, resource ceilings 413, and audio the engine
/// cannot handle 422.
pub fn error_response(err: &CompositionError) -> HttpResponse {
    let body = json!({ "error": err.to_string() });
    match err {
        CompositionError::NoInput
        | CompositionError::GapCountMismatch { .. }
        | CompositionError::InvalidGap { .. }
        | CompositionError::InvalidDuration(_) => HttpResponse::BadRequest().json(body),
        CompositionError::TooManyClips { .. } | CompositionError::OutputTooLong { .. } => {
            HttpResponse::PayloadTooLarge().json(body)
        }
        CompositionError::Format(_)
        | CompositionError::Decode { .. }
        | CompositionError::UnsupportedOperation(_)
        | CompositionError::SampleRateMismatch { .. } => {
            HttpResponse::UnprocessableEntity().json(body)
        }
    }
}
