use std::time::Duration;

use anyhow::{anyhow, Context as _};
use async_trait::async_trait;
use reqwest::{IntoUrl, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::{CreatureResponse, CreatureSource, FetchError, SpeciesResponse, TypeResponse};
use crate::config::PokeApiConfig;
use crate::types::{DamageRelation, ElementalType};

pub struct PokeApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl PokeApiClient {
    pub fn new(config: &PokeApiConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid pokeapi base url: {}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("{} can't be used as a base url", config.base_url);
        }

        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("{} can't be used as a base url", self.base_url))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: impl IntoUrl) -> Result<T, FetchError> {
        let url = url.into_url().context("Invalid upstream url")?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }

        let body = response
            .error_for_status()
            .with_context(|| format!("Upstream error for {url}"))?
            .text()
            .await
            .with_context(|| format!("Failed to read response from {url}"))?;

        Ok(deserialize_json(&body).with_context(|| format!("Unexpected response from {url}"))?)
    }
}

fn deserialize_json<T: DeserializeOwned>(text: &str) -> anyhow::Result<T> {
    let mut deser = serde_json::Deserializer::from_str(text);
    Ok(serde_path_to_error::deserialize(&mut deser)?)
}

#[async_trait]
impl CreatureSource for PokeApiClient {
    #[tracing::instrument(skip(self))]
    async fn fetch_creature(&self, key: &str) -> Result<CreatureResponse, FetchError> {
        self.get_json(self.endpoint(&["pokemon", key])?).await
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_species(&self, url: &str) -> Result<SpeciesResponse, FetchError> {
        self.get_json(url).await
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_type(&self, ty: ElementalType) -> Result<DamageRelation, FetchError> {
        let response: TypeResponse = self.get_json(self.endpoint(&["type", ty.as_str()])?).await?;
        Ok(response.damage_relations.into())
    }
}
