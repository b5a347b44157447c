//! Server configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use spaceblock::container::{PlanetConfig, ShipConfig};
use spaceblock::terrain::TerrainParams;

use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Simulation ticks per second
    pub tick_rate: u32,
    pub planet: PlanetConfig,
    pub terrain: TerrainParams,
    pub ship: ShipConfig,
    /// Directory holding saved ships
    pub save_directory: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: 20,
            planet: PlanetConfig::default(),
            terrain: TerrainParams::default(),
            ship: ShipConfig::default(),
            save_directory: PathBuf::from("saves"),
        }
    }
}

impl ServerConfig {
    /// Load from a JSON file. Missing fields take their default value.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Duration of one tick in seconds
    pub fn tick_duration(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.json");
        std::fs::write(&path, r#"{ "tick_rate": 60, "ship": { "tile_size": 2.0, "gravity": 3.0 } }"#).unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.ship.gravity, 3.0);
        assert_eq!(config.planet, PlanetConfig::default());
        assert!((config.tick_duration() - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("server.json");

        let mut config = ServerConfig::default();
        config.terrain.seed = 1234;
        config.save(&path).unwrap();

        assert_eq!(ServerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(ServerConfig::load(&path), Err(crate::ServerError::Json(_))));
    }
}
