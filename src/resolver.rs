use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use futures::future::try_join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cache::RecordCache;
use crate::effectiveness::{self, EffectivenessError, EffectivenessResult};
use crate::types::ElementalType;
use crate::upstream::{CreatureSource, FetchError, SpeciesResponse};

pub const CACHE_KEY_PREFIX: &str = "creature_";
pub const MISSING_POKEDEX_ENTRY: &str = "No Pokedex entry available.";

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex"));

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatureRecord {
    pub id: u32,
    pub name: String,
    pub types: Vec<ElementalType>,
    pub weaknesses: EffectivenessResult,
    pub pokedex_entry: String,
    pub sprite: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("No creature called {0:?}")]
    NotFound(String),
    #[error("Failed to fetch creature data: {0:#}")]
    Upstream(anyhow::Error),
    #[error("Creature data is inconsistent: {0}")]
    MalformedData(String),
}

impl From<EffectivenessError> for ResolveError {
    fn from(error: EffectivenessError) -> Self {
        ResolveError::MalformedData(error.to_string())
    }
}

impl From<FetchError> for ResolveError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::NotFound(what) => {
                ResolveError::Upstream(anyhow::anyhow!("{what} doesn't exist upstream"))
            }
            FetchError::Other(e) => ResolveError::Upstream(e),
        }
    }
}

/// A trimmed, lower-cased name or id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LookupKey(String);

impl LookupKey {
    pub fn parse(name_or_id: &str) -> Option<Self> {
        let key = name_or_id.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }

        Some(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn cache_key(&self) -> String {
        format!("{CACHE_KEY_PREFIX}{}", self.0)
    }
}

impl Display for LookupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Replaces line breaks and form feeds with spaces, then collapses every
/// whitespace run into one space.
pub fn normalize_flavor_text(text: &str) -> String {
    let text = text.replace(['\n', '\x0c'], " ");
    WHITESPACE_RUN.replace_all(&text, " ").into_owned()
}

/// The last English entry, normalized.
pub fn latest_pokedex_entry(species: &SpeciesResponse) -> String {
    species
        .flavor_text_entries
        .iter()
        .rev()
        .find(|entry| entry.language.name == "en")
        .map(|entry| normalize_flavor_text(&entry.flavor_text))
        .unwrap_or_else(|| MISSING_POKEDEX_ENTRY.to_string())
}

pub struct Resolver {
    source: Arc<dyn CreatureSource>,
    cache: RecordCache,
}

impl Resolver {
    pub fn new(source: Arc<dyn CreatureSource>, cache: RecordCache) -> Self {
        Self { source, cache }
    }

    /// Looks a creature up by name or id, from the cache when possible.
    ///
    /// Nothing is cached unless every fetch succeeded.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, name_or_id: &str) -> Result<CreatureRecord, ResolveError> {
        let key = LookupKey::parse(name_or_id)
            .ok_or_else(|| ResolveError::NotFound(name_or_id.to_string()))?;
        let cache_key = key.cache_key();

        if let Some(record) = self.cache.get::<CreatureRecord>(&cache_key).await {
            tracing::debug!(%cache_key, "Serving creature from cache");
            return Ok(record);
        }

        let creature = match self.source.fetch_creature(key.as_str()).await {
            Ok(creature) => creature,
            Err(FetchError::NotFound(_)) => return Err(ResolveError::NotFound(key.to_string())),
            Err(e) => return Err(e.into()),
        };
        let species = self.source.fetch_species(&creature.species.url).await?;

        let types: Vec<ElementalType> = creature.types.iter().map(|slot| slot.ty.name).collect();
        let weaknesses = self.effectiveness(&types).await?;

        let record = CreatureRecord {
            id: creature.id,
            name: creature.name,
            types,
            weaknesses,
            pokedex_entry: latest_pokedex_entry(&species),
            sprite: creature.sprites.preferred().map(str::to_owned),
        };

        for alias in cache_aliases(cache_key, &record) {
            self.cache.put(&alias, &record).await;
        }

        tracing::info!(id = record.id, name = %record.name, "Resolved creature");
        Ok(record)
    }

    /// The damage breakdown for one type, or two distinct types.
    #[tracing::instrument(skip(self))]
    pub async fn matchup(
        &self,
        types: &[ElementalType],
    ) -> Result<EffectivenessResult, ResolveError> {
        if types.is_empty() || types.len() > 2 {
            return Err(ResolveError::MalformedData(format!(
                "A matchup needs one or two types, got {}",
                types.len()
            )));
        }
        if let [first, second] = types {
            if first == second {
                return Err(EffectivenessError::DuplicateType(*first).into());
            }
        }

        self.effectiveness(types).await
    }

    async fn effectiveness(
        &self,
        types: &[ElementalType],
    ) -> Result<EffectivenessResult, ResolveError> {
        let relations = try_join_all(types.iter().map(|ty| async move {
            self.source
                .fetch_type(*ty)
                .await
                .map(|relation| (*ty, relation))
        }))
        .await?;
        let relations: HashMap<_, _> = relations.into_iter().collect();

        Ok(effectiveness::calculate(types, &relations)?)
    }
}

/// The requested key first, then the canonical name and id keys.
fn cache_aliases(requested: String, record: &CreatureRecord) -> Vec<String> {
    let mut aliases = vec![requested];
    for alias in [
        format!("{CACHE_KEY_PREFIX}{}", record.name.to_lowercase()),
        format!("{CACHE_KEY_PREFIX}{}", record.id),
    ] {
        if !aliases.contains(&alias) {
            aliases.push(alias);
        }
    }

    aliases
}
