use actix_web::web::{Data, ServiceConfig};
use shuttle_actix_web::ShuttleActixWeb;
use shuttle_runtime::SecretStore;
use tracing::info;
use zenhub_webhook::{config::Config, webhook, State, DEFAULT_CONFIG_FILE_PATH};

#[shuttle_runtime::main]
async fn main(
    #[shuttle_runtime::Secrets] secrets: SecretStore,
) -> ShuttleActixWeb<impl FnOnce(&mut ServiceConfig) + Send + Clone + 'static> {
    let config_path = secrets
        .get("ZENHUB-WEBHOOK-CONFIG")
        .unwrap_or_else(|| String::from(DEFAULT_CONFIG_FILE_PATH));

    let config = Config::load_or_default(&config_path)
        .map_err(|err| shuttle_runtime::Error::Custom(err.into()))?;
    info!("Loaded configuration from {}", config_path);

    let state = Data::new(State::from_config(&config));

    let config = move |cfg: &mut ServiceConfig| {
        cfg.service(webhook::parse_event).app_data(state);
    };

    Ok(config.into())
}
