//! Cycle report server: main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use actix_web::{App, HttpServer, web};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use cycle_report_lib::api;
use cycle_report_lib::config::Config;
use cycle_report_lib::db::DbPool;
use cycle_report_lib::middleware::RequestLogger;

/// Upper bound for JSON bodies; spec reports carry every case of a spec.
const JSON_LIMIT: usize = 16 * 1024 * 1024;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(1);
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL must be set to a non-default value");
            error!("  - LAST_X_RUN, RECENT_CONSECUTIVE and SPEC_LAST_X_RUN must be at least 1");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Cycle Report Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let pool = match DbPool::new(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };
    info!("Database connection established");

    if let Err(e) = pool.run_migrations().await {
        error!("{}", e);
        std::process::exit(1);
    }
    info!("Database migrations complete");

    if !config.known_issue_dir.is_dir() {
        warn!(
            "Known-issue directory {} does not exist; cycles will start without known issues",
            config.known_issue_dir.display()
        );
    }
    info!(
        last_x_run = config.classification.last_x_run,
        recent_consecutive = config.classification.recent_consecutive,
        spec_last_x_run = config.classification.spec_last_x_run,
        "Classification configured"
    );

    let bind_address = config.bind_address();
    let worker_count = if config.is_development() {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!("Starting server at http://{} ({} workers)", bind_address, cpus);
        cpus
    };

    let pool = web::Data::new(pool);
    let config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(pool.clone())
            .app_data(config.clone())
            .app_data(web::JsonConfig::default().limit(JSON_LIMIT).error_handler(|err, _| {
                cycle_report_lib::error::AppError::InvalidInput(err.to_string()).into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _| {
                cycle_report_lib::error::AppError::InvalidInput(err.to_string()).into()
            }))
            .service(web::scope("/api/v1").configure(api::configure))
    })
    .workers(worker_count)
    .bind(&bind_address)?
    .run()
    .await
}
