use actix_web::{
    post,
    web::{self, Json},
    HttpResponse, Responder,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::app_state::AppState;
use crate::clip::{AudioClip, ContainerFormat};
use crate::endpoints::error_response;

#[derive(Deserialize)]
pub struct ClipPayload {
    #[serde(default)]
    pub label: Option<String>,
    /// `wav`, `mp3` or a MIME type; sniffed from the bytes when absent.
    #[serde(default)]
    pub format: Option<String>,
    /// Base64-encoded audio bytes.
    pub data: String,
}

#[derive(Deserialize)]
pub struct ComposeRequest {
    pub clips: Vec<ClipPayload>,
    /// Seconds between consecutive clips; all zeros when absent.
    #[serde(default)]
    pub gaps: Option<Vec<f64>>,
}

#[post("/compose")]
pub async fn post_compose(
    state: web::Data<AppState>,
    payload: Json<ComposeRequest>,
) -> impl Responder {
    info!("POST /compose endpoint called");
    let request = payload.into_inner();

    // 1) Decode the base64 payloads into clips
    let mut clips = Vec::with_capacity(request.clips.len());
    for (i, clip) in request.clips.into_iter().enumerate() {
        let bytes = match BASE64.decode(clip.data.as_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                info!("Clip #{} has invalid base64: {}", i + 1, e);
                let err = json!({ "error": format!("Clip #{} is not valid base64: {e}", i + 1) });
                return HttpResponse::BadRequest().json(err);
            }
        };

        let format = match clip.format.as_deref() {
            Some(label) => ContainerFormat::from_label(label),
            None => ContainerFormat::sniff(&bytes),
        };
        let label = clip.label.unwrap_or_else(|| format!("clip-{}", i + 1));
        info!("Clip #{} ({}): {} bytes of {}", i + 1, label, bytes.len(), format);
        clips.push(AudioClip::encoded(bytes, format, label));
    }

    // 2) Fill in abutting gaps when the caller gave none
    let gaps = request
        .gaps
        .unwrap_or_else(|| vec![0.0; clips.len().saturating_sub(1)]);

    // 3) Compose and return the audio
    match state.composer.compose(&clips, &gaps).await {
        Ok(result) => HttpResponse::Ok()
            .content_type(result.mime_type)
            .insert_header(("X-Composition-Strategy", result.strategy.as_str()))
            .body(result.bytes),
        Err(e) => {
            info!("Composition failed: {}", e);
            error_response(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{test, App};
    use serde_json::Value;

    use super::*;
    use crate::clip::PcmBuffer;
    use crate::config::ComposerConfig;
    use crate::endpoints::configure;
    use crate::services::composition_service::Composer;
    use crate::services::decode_service::WavPcmDecoder;
    use crate::utils::wav::{encode_pcm16, parse_wav};

    fn state() -> web::Data<AppState> {
        let composer = Composer::new(Arc::new(WavPcmDecoder), ComposerConfig::default());
        web::Data::new(AppState::new(composer))
    }

    fn tone_base64(value: f32, frames: usize) -> String {
        let pcm = PcmBuffer::new(8_000, vec![vec![value; frames]]);
        BASE64.encode(encode_pcm16(&pcm))
    }

    #[actix_web::test]
    async fn compose_mixes_clips_with_gaps() {
        let app = test::init_service(
            App::new()
                .app_data(state())
                .service(web::scope("/api").configure(configure)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/compose")
            .set_json(json!({
                "clips": [
                    { "label": "a", "data": tone_base64(0.25, 800) },
                    { "label": "b", "format": "wav", "data": tone_base64(0.25, 800) }
                ],
                "gaps": [-0.05]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
        assert_eq!(resp.headers().get("content-type").unwrap(), "audio/wav");
        assert_eq!(resp.headers().get("x-composition-strategy").unwrap(), "mixed");
        let body = test::read_body(resp).await;
        // 800 + 800 - 400 overlapping frames
        assert_eq!(parse_wav(&body).unwrap().data_length, 1_200 * 2);
    }

    #[actix_web::test]
    async fn compose_defaults_to_concatenation() {
        let app = test::init_service(
            App::new()
                .app_data(state())
                .service(web::scope("/api").configure(configure)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/compose")
            .set_json(json!({
                "clips": [
                    { "data": tone_base64(0.5, 10) },
                    { "data": tone_base64(0.5, 10) }
                ]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get("x-composition-strategy").unwrap(),
            "concatenated"
        );
    }

    #[actix_web::test]
    async fn empty_clip_list_is_a_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(state())
                .service(web::scope("/api").configure(configure)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/compose")
            .set_json(json!({ "clips": [] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 400);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "no audio to compose");
    }

    #[actix_web::test]
    async fn invalid_base64_is_a_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(state())
                .service(web::scope("/api").configure(configure)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/compose")
            .set_json(json!({ "clips": [{ "data": "%%%" }] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 400);
    }

    #[actix_web::test]
    async fn undecodable_clip_is_unprocessable() {
        let app = test::init_service(
            App::new()
                .app_data(state())
                .service(web::scope("/api").configure(configure)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/compose")
            .set_json(json!({
                "clips": [
                    { "data": tone_base64(0.5, 10) },
                    { "format": "mp3", "data": BASE64.encode([0xFFu8, 0xFB, 0x00]) }
                ],
                "gaps": [0.1]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 422);
    }
}
