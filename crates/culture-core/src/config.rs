//! Configuration types for the simulation.

use crate::error::{check_chance, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Grid configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Width of the grid in cells
    pub width: usize,
    /// Height of the grid in cells
    pub height: usize,
    /// Optional circular habitat restricting growth
    pub habitat: Option<HabitatConfig>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            habitat: None,
        }
    }
}

/// Circular habitat centred on the grid
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HabitatConfig {
    pub radius: f64,
}

/// How an organism picks the cells it grows into and attacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expansion {
    /// Every cell of the adjacency ring gets an independent draw.
    #[default]
    Ring,
    /// Every boundary cell picks one free 4-neighbour and gets one draw for it.
    Frontier,
}

/// Per-tick rule parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub expansion: Expansion,
    /// Enable the per-cell life field and the decay pass
    pub track_life: bool,
    /// Life of a seed cell placed by hand; randomly spawned seeds draw
    /// theirs from [0, seed_life_max)
    pub seed_life_max: f64,
    /// Upper bound of the random term added to a grown cell's life
    pub life_jitter: f64,
    /// Constant added to a grown cell's life
    pub life_floor: f64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            expansion: Expansion::Ring,
            track_life: false,
            seed_life_max: 10.0,
            life_jitter: 0.5,
            life_floor: 0.1,
        }
    }
}

/// Parameters for randomly spawned organisms
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Number of organisms seeded at setup
    pub organisms: usize,
    pub grow_chance_min: f64,
    pub grow_chance_max: f64,
    pub attack_chance_min: f64,
    pub attack_chance_max: f64,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            organisms: 10,
            grow_chance_min: 0.1,
            grow_chance_max: 0.6,
            attack_chance_min: 0.0,
            attack_chance_max: 1.0,
        }
    }
}

/// Complete simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Stop after this many ticks; `None` runs until one organism is left
    pub num_ticks: Option<u64>,
    /// Delay between frames in milliseconds
    pub frame_interval_ms: u64,
    pub world: WorldConfig,
    pub rules: RuleConfig,
    pub spawn: SpawnConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            num_ticks: None,
            frame_interval_ms: 33, // ~30 fps
            world: WorldConfig::default(),
            rules: RuleConfig::default(),
            spawn: SpawnConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.world.width < 3 || self.world.height < 3 {
            return Err(Error::InvalidParameter(format!(
                "grid must be at least 3x3, got {}x{}",
                self.world.width, self.world.height
            )));
        }

        if let Some(habitat) = self.world.habitat {
            if !(habitat.radius > 0.0) {
                return Err(Error::InvalidParameter(format!(
                    "habitat radius must be positive, got {}",
                    habitat.radius
                )));
            }
        }

        let spawn = &self.spawn;
        check_range("grow_chance", spawn.grow_chance_min, spawn.grow_chance_max)?;
        check_range("attack_chance", spawn.attack_chance_min, spawn.attack_chance_max)?;

        let rules = &self.rules;
        if rules.seed_life_max < 0.0 || rules.life_jitter < 0.0 || rules.life_floor < 0.0 {
            return Err(Error::InvalidParameter(
                "life parameters must be non-negative".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_range(name: &str, min: f64, max: f64) -> Result<()> {
    check_chance(&format!("{}_min", name), min)?;
    check_chance(&format!("{}_max", name), max)?;
    if min > max {
        return Err(Error::InvalidParameter(format!(
            "{} range is inverted: {} > {}",
            name, min, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let config = SimulationConfig::default();
        assert_eq!(config.world.width, 100);
        assert_eq!(config.world.height, 100);
        assert_eq!(config.spawn.organisms, 10);
        assert_eq!(config.rules.expansion, Expansion::Ring);
        assert!(!config.rules.track_life);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SimulationConfig::from_json_str(
            r#"{ "seed": 9, "world": { "width": 40, "height": 20, "habitat": { "radius": 8.0 } },
                 "rules": { "expansion": "frontier" } }"#,
        )
        .unwrap();

        assert_eq!(config.seed, 9);
        assert_eq!(config.world.width, 40);
        assert_eq!(config.world.habitat.unwrap().radius, 8.0);
        assert_eq!(config.rules.expansion, Expansion::Frontier);
        assert_eq!(config.spawn.organisms, 10);
        assert_eq!(config.frame_interval_ms, 33);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = SimulationConfig::default();
        config.world.width = 2;
        assert!(matches!(config.validate(), Err(Error::InvalidParameter(_))));

        let mut config = SimulationConfig::default();
        config.spawn.grow_chance_min = 0.8;
        config.spawn.grow_chance_max = 0.2;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.spawn.attack_chance_max = 1.2;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.world.habitat = Some(HabitatConfig { radius: 0.0 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let result = SimulationConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(Error::Serialization(_))));
    }
}
