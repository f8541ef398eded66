use std::sync::Arc;

use actix_web::web::{self, ServiceConfig};
use shuttle_actix_web::ShuttleActixWeb;
use shuttle_runtime::SecretStore;
use tracing::info;

use clip_composer::app_state::AppState;
use clip_composer::endpoints::configure;
use clip_composer::{Composer, ComposerConfig, SymphoniaDecoder};

#[shuttle_runtime::main]
async fn main(
    #[shuttle_runtime::Secrets] secrets: SecretStore,
) -> ShuttleActixWeb<impl FnOnce(&mut ServiceConfig) + Send + Clone + 'static> {
    let config = ComposerConfig::from_lookup(|key| secrets.get(key));
    info!("Starting composer with {:?}", config);

    let app_config = move |cfg: &mut ServiceConfig| {
        let state = web::Data::new(AppState::new(Composer::new(
            Arc::new(SymphoniaDecoder),
            config,
        )));

        cfg.service(
            web::scope("/api")
                .app_data(web::JsonConfig::default().limit(config.max_request_bytes))
                .configure(configure),
        )
        .app_data(state);
    };

    Ok(app_config.into())
}
