use std::time::Instant;

use diesel::connection::{Instrumentation, InstrumentationEvent};
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness};
use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec};

pub static QUERY_HISTOGRAM: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("diesel_query_seconds", "SQL query duration").buckets(vec![
            0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 1.0,
        ]),
        &["query"],
    )
    .expect("Failed to create query histogram")
});

#[derive(Default)]
pub struct DbInstrumentation {
    query_start: Option<Instant>,
}

impl Instrumentation for DbInstrumentation {
    fn on_connection_event(&mut self, event: InstrumentationEvent<'_>) {
        match event {
            InstrumentationEvent::StartQuery { .. } => {
                self.query_start = Some(Instant::now());
            }
            InstrumentationEvent::FinishQuery { query, error, .. } => {
                let Some(query_start) = self.query_start.take() else {
                    return;
                };
                let elapsed = query_start.elapsed();
                let query = query.to_string().replace('\n', " ");
                let query = query.split("--").next().unwrap_or_default().trim();
                QUERY_HISTOGRAM
                    .with_label_values(&[query])
                    .observe(elapsed.as_secs_f64());
                match error {
                    Some(error) => tracing::warn!(%query, %error, "Query failed"),
                    None => tracing::debug!(%query, "Query finished"),
                }
            }
            InstrumentationEvent::FinishEstablishConnection { error, .. } => {
                if let Some(error) = error {
                    tracing::error!(%error, "Couldn't connect to the database");
                }
            }
            _ => {}
        };
    }
}

/// Builds the connection pool and brings the schema up to date.
pub async fn get_database_pool(
    db_url: &str,
    migrations: EmbeddedMigrations,
) -> anyhow::Result<Pool<AsyncPgConnection>> {
    diesel::connection::set_default_instrumentation(|| {
        Some(Box::new(DbInstrumentation::default()))
    })?;

    let mgr = AsyncDieselConnectionManager::<AsyncPgConnection>::new(db_url);
    let db_pool = Pool::builder(mgr).build()?;

    let connection = db_pool.get().await?;
    let mut async_wrapper: AsyncConnectionWrapper<
        deadpool::managed::Object<AsyncDieselConnectionManager<AsyncPgConnection>>,
    > = AsyncConnectionWrapper::from(connection);
    tokio::task::spawn_blocking(move || {
        async_wrapper
            .run_pending_migrations(migrations)
            .map(|applied| tracing::info!(count = applied.len(), "Applied migrations"))
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))
    })
    .await??;

    Ok(db_pool)
}
