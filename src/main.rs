use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use std::sync::Arc;
use std::time::Duration;

use hrms_attendance::config::{Config, DeviceMode};
use hrms_attendance::db::init_db;
use hrms_attendance::device::{BioTimeClient, PunchSource, SimulatedSource};
use hrms_attendance::docs::ApiDoc;
use hrms_attendance::routes::{self, RateLimits};
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let pool = init_db(&config.database_url, config.database_max_connections).await?;

    let source: Arc<dyn PunchSource> = match config.device_mode {
        DeviceMode::BioTime => Arc::new(BioTimeClient::new(
            Duration::from_millis(config.device_timeout_ms),
            config.device_port,
        )?),
        DeviceMode::Simulated => {
            warn!("DEVICE_MODE is simulated, synced punches are demo data");
            Arc::new(SimulatedSource)
        }
    };
    info!(source = source.name(), late_threshold = %config.late_policy.threshold, "Attendance device configured");

    let limits = RateLimits::from_config(&config)?;
    let source = Data::from(source);
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(source.clone())
            .configure(|cfg| routes::configure(cfg, &config, &limits))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
