use anyhow::Context as _;
use rocket::figment::Figment;
use serde::Deserialize;

use crate::error::Result;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";

/// The `[<profile>.pokeapi]` section of `Rocket.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PokeApiConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for PokeApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: 10,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

impl PokeApiConfig {
    pub fn from_figment(config: &Figment) -> Result<Self> {
        if config.find_value("pokeapi").is_err() {
            tracing::info!("No pokeapi section in config, using {}", DEFAULT_BASE_URL);
            return Ok(Self::default());
        }

        Ok(config
            .extract_inner::<Self>("pokeapi")
            .context("Invalid pokeapi section in config")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_section_uses_defaults() {
        let config = PokeApiConfig::from_figment(&Figment::new()).unwrap();
        assert_eq!(config, PokeApiConfig::default());
        assert_eq!(config.base_url, "https://pokeapi.co/api/v2");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let figment = Figment::new().merge(("pokeapi.base_url", "http://localhost:8000/api/v2"));
        let config = PokeApiConfig::from_figment(&figment).unwrap();
        assert_eq!(config.base_url, "http://localhost:8000/api/v2");
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn test_invalid_section_is_an_error() {
        let figment = Figment::new().merge(("pokeapi.connect_timeout_secs", "soon"));
        assert!(PokeApiConfig::from_figment(&figment).is_err());
    }
}
