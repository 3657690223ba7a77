//! Payloads and the fetching seam for the creature data service.
//!
//! Only the fields the resolver reads are modelled; anything else in the
//! responses is ignored.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{DamageRelation, ElementalType};

mod pokeapi;

pub use pokeapi::PokeApiClient;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{0} doesn't exist upstream")]
    NotFound(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait CreatureSource: Send + Sync {
    /// `GET /pokemon/{key}`
    async fn fetch_creature(&self, key: &str) -> Result<CreatureResponse, FetchError>;

    /// `GET {species url}`, with the url taken from [`CreatureResponse::species`].
    async fn fetch_species(&self, url: &str) -> Result<SpeciesResponse, FetchError>;

    /// `GET /type/{name}`
    async fn fetch_type(&self, ty: ElementalType) -> Result<DamageRelation, FetchError>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreatureResponse {
    pub id: u32,
    pub name: String,
    pub types: Vec<TypeSlot>,
    pub sprites: Sprites,
    pub species: NamedResource,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NamedResource {
    pub name: String,
    pub url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypeSlot {
    pub slot: u8,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TypeRef {
    pub name: ElementalType,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Sprites {
    pub front_default: Option<String>,
    #[serde(default)]
    pub other: Option<OtherSprites>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OtherSprites {
    #[serde(rename = "official-artwork", default)]
    pub official_artwork: Option<Artwork>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Artwork {
    pub front_default: Option<String>,
}

impl Sprites {
    /// Official artwork if there is one, the default front sprite otherwise.
    pub fn preferred(&self) -> Option<&str> {
        self.other
            .as_ref()
            .and_then(|other| other.official_artwork.as_ref())
            .and_then(|artwork| artwork.front_default.as_deref())
            .or(self.front_default.as_deref())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpeciesResponse {
    pub flavor_text_entries: Vec<FlavorTextEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlavorTextEntry {
    pub flavor_text: String,
    pub language: LanguageRef,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LanguageRef {
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypeResponse {
    pub name: String,
    pub damage_relations: DamageRelationsResponse,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DamageRelationsResponse {
    pub double_damage_from: Vec<TypeRef>,
    pub half_damage_from: Vec<TypeRef>,
    pub no_damage_from: Vec<TypeRef>,
}

impl From<DamageRelationsResponse> for DamageRelation {
    fn from(relations: DamageRelationsResponse) -> Self {
        let names = |refs: Vec<TypeRef>| -> Vec<ElementalType> {
            refs.into_iter().map(|r| r.name).collect()
        };
        DamageRelation {
            double_damage_from: names(relations.double_damage_from),
            half_damage_from: names(relations.half_damage_from),
            no_damage_from: names(relations.no_damage_from),
        }
    }
}
