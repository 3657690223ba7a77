use std::sync::Arc;

use diesel_migrations::{embed_migrations, EmbeddedMigrations};
use dotenvy::dotenv;
use rocket::figment::Provider;
use rocket::{Build, Rocket};
use rocket_prometheus::PrometheusMetrics;

use crate::cache::{CacheStore, MemoryStore, PgStore, RecordCache};
use crate::config::PokeApiConfig;
use crate::instrumentation::CacheMetrics;
use crate::resolver::Resolver;
use crate::upstream::PokeApiClient;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations/");

pub mod cache;
pub mod config;
pub mod db;
pub mod effectiveness;
pub mod error;
pub mod instrumentation;
pub mod otlp;
pub mod resolver;
pub mod schema;
pub mod types;
pub mod upstream;
pub mod views;

/// The service without metrics, so several instances can coexist in tests.
pub fn build_rocket<T: Provider>(provider: T, resolver: Resolver) -> Rocket<Build> {
    rocket::custom(provider)
        .attach(otlp::RouteSpanFairing)
        .mount("/", views::api::routes())
        .register("/", views::catchers())
        .manage(resolver)
}

/// Postgres when `DATABASE_URL` is set, memory otherwise.
pub async fn cache_store_from_env() -> crate::error::Result<Arc<dyn CacheStore>> {
    match std::env::var("DATABASE_URL") {
        Ok(db_url) => {
            let db_pool = db::get_database_pool(&db_url, MIGRATIONS).await?;
            tracing::info!("Caching records in postgres");
            Ok(Arc::new(PgStore::new(db_pool)))
        }
        Err(_) => {
            tracing::warn!("No DATABASE_URL specified, caching records in memory");
            Ok(Arc::new(MemoryStore::default()))
        }
    }
}

#[rocket::main]
pub async fn main() -> crate::error::Result<()> {
    dotenv().ok();

    let _sentry_guard = if let Ok(sentry_dsn) = std::env::var("SENTRY_DSN") {
        Some(sentry::init((
            sentry_dsn,
            sentry::ClientOptions {
                release: Some(
                    format!("{}@{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")).into(),
                ),
                environment: Some(otlp::environment().into()),
                traces_sample_rate: 1.0,
                ..Default::default()
            },
        )))
    } else {
        None
    };

    let otlp_endpoint = std::env::var("OTLP_ENDPOINT").ok();
    let _guard = otlp::init_tracing_subscriber(otlp_endpoint)?;

    let figment = rocket::Config::figment();
    let pokeapi_config = PokeApiConfig::from_figment(&figment)?;

    let prometheus = PrometheusMetrics::new();
    prometheus
        .registry()
        .register(Box::new(db::QUERY_HISTOGRAM.clone()))?;
    let cache_metrics = CacheMetrics::new(prometheus.registry())?;

    let cache = RecordCache::new(cache_store_from_env().await?).with_metrics(cache_metrics);
    let source = Arc::new(PokeApiClient::new(&pokeapi_config)?);
    let resolver = Resolver::new(source, cache);

    build_rocket(figment, resolver)
        .attach(prometheus.clone())
        .mount("/metrics", prometheus)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Rocket launch failed: {}", e))?;

    Ok(())
}
