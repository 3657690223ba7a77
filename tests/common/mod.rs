#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use battledex::cache::{ManualClock, MemoryStore, RecordCache};
use battledex::resolver::Resolver;
use battledex::types::{DamageRelation, ElementalType};
use battledex::upstream::{CreatureResponse, CreatureSource, FetchError, SpeciesResponse};
use serde_json::json;
use ElementalType::*;

pub const START_MILLIS: i64 = 1_700_000_000_000;

#[derive(Default)]
pub struct FakeSource {
    creatures: HashMap<String, CreatureResponse>,
    species: HashMap<String, SpeciesResponse>,
    types: HashMap<ElementalType, DamageRelation>,
    failing_types: HashSet<ElementalType>,
    pub creature_calls: AtomicUsize,
    pub species_calls: AtomicUsize,
    pub type_calls: AtomicUsize,
}

impl FakeSource {
    /// Pikachu, Charizard and Gengar, plus the type relations they need.
    pub fn new() -> Self {
        let mut source = FakeSource::default();

        source.add_creature(json!({
            "id": 25,
            "name": "pikachu",
            "types": [{"slot": 1, "type": {"name": "electric", "url": "https://pokeapi.test/type/13/"}}],
            "sprites": {
                "front_default": "https://sprites.test/25.png",
                "other": {"official-artwork": {"front_default": "https://artwork.test/25.png"}}
            },
            "species": {"name": "pikachu", "url": "https://pokeapi.test/pokemon-species/25/"}
        }));
        source.add_species(
            "https://pokeapi.test/pokemon-species/25/",
            json!({"flavor_text_entries": [
                {"flavor_text": "An old entry.", "language": {"name": "en", "url": ""}},
                {"flavor_text": "ほっぺたの りょうがわに", "language": {"name": "ja", "url": ""}},
                {"flavor_text": "It stores\nelectricity in\u{c}its   cheeks.", "language": {"name": "en", "url": ""}},
                {"flavor_text": "Il stocke l'électricité.", "language": {"name": "fr", "url": ""}}
            ]}),
        );

        source.add_creature(json!({
            "id": 6,
            "name": "charizard",
            "types": [
                {"slot": 1, "type": {"name": "fire"}},
                {"slot": 2, "type": {"name": "flying"}}
            ],
            "sprites": {
                "front_default": "https://sprites.test/6.png",
                "other": {"official-artwork": {"front_default": null}}
            },
            "species": {"name": "charizard", "url": "https://pokeapi.test/pokemon-species/6/"}
        }));
        source.add_species(
            "https://pokeapi.test/pokemon-species/6/",
            json!({"flavor_text_entries": [
                {"flavor_text": "It spits fire that\nis hot enough to\nmelt boulders.", "language": {"name": "en"}}
            ]}),
        );

        source.add_creature(json!({
            "id": 94,
            "name": "gengar",
            "types": [
                {"slot": 1, "type": {"name": "ghost"}},
                {"slot": 2, "type": {"name": "poison"}}
            ],
            "sprites": {"front_default": null},
            "species": {"name": "gengar", "url": "https://pokeapi.test/pokemon-species/94/"}
        }));
        source.add_species(
            "https://pokeapi.test/pokemon-species/94/",
            json!({"flavor_text_entries": [
                {"flavor_text": "Sous la pleine lune.", "language": {"name": "fr"}}
            ]}),
        );

        source.add_type(Electric, &[Ground], &[Flying, Steel, Electric], &[]);
        source.add_type(
            Fire,
            &[Water, Ground, Rock],
            &[Fire, Grass, Ice, Bug, Steel, Fairy],
            &[],
        );
        source.add_type(Flying, &[Electric, Ice, Rock], &[Grass, Fighting, Bug], &[Ground]);
        source.add_type(Ghost, &[Ghost, Dark], &[Poison, Bug], &[Normal, Fighting]);
        source.add_type(
            Poison,
            &[Ground, Psychic],
            &[Fighting, Poison, Bug, Grass, Fairy],
            &[],
        );
        source.add_type(Normal, &[Fighting], &[], &[Ghost]);
        source.add_type(Psychic, &[Bug, Ghost, Dark], &[Fighting, Psychic], &[]);

        source
    }

    /// Makes every fetch of `ty` fail with a transport-style error.
    pub fn failing_type(mut self, ty: ElementalType) -> Self {
        self.failing_types.insert(ty);
        self
    }

    pub fn creature_calls(&self) -> usize {
        self.creature_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.creature_calls.load(Ordering::SeqCst)
            + self.species_calls.load(Ordering::SeqCst)
            + self.type_calls.load(Ordering::SeqCst)
    }

    fn add_creature(&mut self, payload: serde_json::Value) {
        let creature: CreatureResponse =
            serde_json::from_value(payload).expect("Invalid creature fixture");
        self.creatures
            .insert(creature.id.to_string(), creature.clone());
        self.creatures.insert(creature.name.clone(), creature);
    }

    fn add_species(&mut self, url: &str, payload: serde_json::Value) {
        let species = serde_json::from_value(payload).expect("Invalid species fixture");
        self.species.insert(url.to_string(), species);
    }

    fn add_type(
        &mut self,
        ty: ElementalType,
        double: &[ElementalType],
        half: &[ElementalType],
        none: &[ElementalType],
    ) {
        self.types.insert(
            ty,
            DamageRelation {
                double_damage_from: double.to_vec(),
                half_damage_from: half.to_vec(),
                no_damage_from: none.to_vec(),
            },
        );
    }
}

#[async_trait]
impl CreatureSource for FakeSource {
    async fn fetch_creature(&self, key: &str) -> Result<CreatureResponse, FetchError> {
        self.creature_calls.fetch_add(1, Ordering::SeqCst);
        self.creatures
            .get(key)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("pokemon/{key}")))
    }

    async fn fetch_species(&self, url: &str) -> Result<SpeciesResponse, FetchError> {
        self.species_calls.fetch_add(1, Ordering::SeqCst);
        self.species
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }

    async fn fetch_type(&self, ty: ElementalType) -> Result<DamageRelation, FetchError> {
        self.type_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_types.contains(&ty) {
            return Err(anyhow!("Connection reset while fetching type/{ty}").into());
        }

        self.types
            .get(&ty)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("type/{ty}")))
    }
}

pub struct Harness {
    pub source: Arc<FakeSource>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub resolver: Resolver,
}

pub fn harness(source: FakeSource) -> Harness {
    let source = Arc::new(source);
    let store = Arc::new(MemoryStore::default());
    let clock = Arc::new(ManualClock::new(START_MILLIS));
    let cache = RecordCache::new(store.clone()).with_clock(clock.clone());
    let resolver = Resolver::new(source.clone(), cache);

    Harness {
        source,
        store,
        clock,
        resolver,
    }
}
