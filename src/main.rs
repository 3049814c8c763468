use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use phreddit::openapi::ApiDoc;
use phreddit::repo::Repo;
use phreddit::{config, AppState, SecurityHeaders, Settings};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    Settings::validate()?;
    let settings = Settings::from_env();
    info!(frontend = %settings.frontend_url, "bootstrapping phreddit server");

    let repo = build_repo(&settings).await?;

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "metrics recorder not installed");
            None
        }
    };

    let mut state = AppState::new(repo, settings.clone());
    state.metrics = metrics;
    let openapi = ApiDoc::openapi();
    let frontend = settings.frontend_url.clone();
    let security = SecurityHeaders::from_settings(&settings);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend)
            .allow_any_header()
            .allowed_methods(["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(security.clone())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind((settings.bind_addr.as_str(), settings.port))?;

    info!("listening on http://{}:{}", settings.bind_addr, settings.port);
    server.run().await?;
    Ok(())
}

#[cfg(not(feature = "postgres-store"))]
async fn build_repo(settings: &Settings) -> anyhow::Result<Arc<dyn Repo>> {
    info!(data_dir = %settings.data_dir, "using in-memory repository backend");
    Ok(Arc::new(phreddit::repo::inmem::InMemRepo::with_data_dir(&settings.data_dir)))
}

#[cfg(feature = "postgres-store")]
async fn build_repo(settings: &Settings) -> anyhow::Result<Arc<dyn Repo>> {
    use sqlx::postgres::PgPoolOptions;
    let url = settings
        .database_url
        .as_deref()
        .ok_or(phreddit::config::ConfigError::Missing("DATABASE_URL"))?;
    let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
    let repo = phreddit::repo::pg::PgRepo::new(pool);
    repo.migrate().await?;
    info!("using Postgres repository backend");
    Ok(Arc::new(repo))
}
