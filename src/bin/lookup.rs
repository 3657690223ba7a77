use std::sync::Arc;

use battledex::cache::RecordCache;
use battledex::config::PokeApiConfig;
use battledex::error::Result;
use battledex::resolver::Resolver;
use battledex::upstream::PokeApiClient;
use dotenvy::dotenv;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let keys: Vec<String> = std::env::args().skip(1).collect();
    if keys.is_empty() {
        return Err(anyhow::anyhow!("Usage: battledex-lookup <name or id>...").into());
    }

    let config = PokeApiConfig::from_figment(&rocket::Config::figment())?;
    let cache = RecordCache::new(battledex::cache_store_from_env().await?);
    let resolver = Resolver::new(Arc::new(PokeApiClient::new(&config)?), cache);

    for key in &keys {
        let record = resolver
            .resolve(key)
            .await
            .map_err(|e| anyhow::anyhow!("{key}: {e}"))?;
        println!("{}", serde_json::to_string_pretty(&record)?);
    }

    Ok(())
}
