use std::sync::Arc;

use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::runtime::TokioCurrentThread;
use paperclip::actix::OpenApiExt;
use tracing_actix_web::TracingLogger;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use library_service::app_config::config_app;
use library_service::handlers::json_config;
use library_service::library_repository::{
    InMemoryLibraryRepository, LibraryRepository, PostgresLibraryRepository,
};
use library_service::settings::Settings;

// Based on https://github.com/LukeMathWalker/tracing-actix-web/blob/main/examples/opentelemetry/src/main.rs#L15
fn init_telemetry(tracing_enabled: bool) -> anyhow::Result<()> {
    let app_name = "library_service";

    // Spans are exported in batch to a Jaeger agent, only when enabled
    global::set_text_map_propagator(TraceContextPropagator::new());
    let telemetry = if tracing_enabled {
        #[allow(deprecated)]
        let tracer = opentelemetry_jaeger::new_agent_pipeline()
            .with_service_name(app_name)
            .install_batch(TokioCurrentThread)
            .context("Failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    // Filter based on level - trace, debug, info, warn, error
    // Tunable via `RUST_LOG` env variable
    let env_filter = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("info"));
    // Emit spans as structured logs to stdout
    let formatting_layer = BunyanFormattingLayer::new(app_name.into(), std::io::stdout);
    let subscriber = Registry::default()
        .with(env_filter)
        .with(telemetry)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install `tracing` subscriber")
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("Failed to load settings")?;
    init_telemetry(settings.tracing_enabled)?;

    let library_repository: Arc<dyn LibraryRepository> = if settings.use_in_memory_db {
        tracing::info!("Using in-memory library repository");
        Arc::new(InMemoryLibraryRepository::default())
    } else {
        Arc::new(
            PostgresLibraryRepository::init(settings.postgres_config())
                .await
                .context("Failed to init postgres")?,
        )
    };

    tracing::info!(
        "starting HTTP server at http://{}:{}",
        settings.listen_address,
        settings.listen_port
    );

    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(Data::new(library_repository.clone()))
            .app_data(json_config())
            .wrap(TracingLogger::default())
            .configure(config_app)
            .with_json_spec_at("/apispec/v2")
            .build()
    })
    .bind((settings.listen_address.as_str(), settings.listen_port))?
    .run()
    .await?;

    Ok(())
}
