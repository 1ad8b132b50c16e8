use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::types::GameConfig;

/// Loads a JSON override on top of the defaults; `None` gives the defaults.
pub fn load_config(path: Option<&Path>) -> Result<GameConfig, ConfigError> {
    let config = match path {
        None => GameConfig::default(),
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            serde_json::from_str::<GameConfig>(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        }
    };
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &GameConfig) -> Result<(), ConfigError> {
    if config.tick_ms == 0 {
        return Err(ConfigError::Invalid("tickMs must be at least 1".to_string()));
    }
    // Anything faster than half a tile per tick could jump a wall check.
    for (name, speed) in [
        ("playerSpeed", config.player_speed),
        ("ghostSpeed", config.ghost_speed),
        (
            "ghostSpeed * deadGhostSpeedMultiplier",
            config.ghost_speed * config.dead_ghost_speed_multiplier,
        ),
    ] {
        if !speed.is_finite() || speed <= 0.0 || speed > 0.5 {
            return Err(ConfigError::Invalid(format!(
                "{name} must be in (0, 0.5], got {speed}"
            )));
        }
    }
    if config.ghost_count == 0 {
        return Err(ConfigError::Invalid("ghostCount must be at least 1".to_string()));
    }
    if config.path_memory == 0 {
        return Err(ConfigError::Invalid("pathMemory must be at least 1".to_string()));
    }
    if config.pathfinding_iter_cap == 0 {
        return Err(ConfigError::Invalid(
            "pathfindingIterCap must be at least 1".to_string(),
        ));
    }
    if config.flee_samples == 0 {
        return Err(ConfigError::Invalid("fleeSamples must be at least 1".to_string()));
    }
    if !(0.0..=1.0).contains(&config.power_node_chance) {
        return Err(ConfigError::Invalid(format!(
            "powerNodeChance must be in [0, 1], got {}",
            config.power_node_chance
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "{}-{}-{}.json",
            name,
            std::process::id(),
            rand::random::<u32>()
        ))
    }

    #[test]
    fn no_path_gives_defaults() {
        let config = load_config(None).expect("defaults are valid");
        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn override_file_is_merged_with_defaults() {
        let path = temp_file("config-merge");
        fs::write(&path, r#"{"ghostCount": 1, "trackingTimeMs": 500}"#).expect("write file");
        let config = load_config(Some(&path)).expect("config loads");
        assert_eq!(config.ghost_count, 1);
        assert_eq!(config.tracking_time_ms, 500);
        assert_eq!(config.path_memory, GameConfig::default().path_memory);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let config = GameConfig {
            ghost_speed: 0.3,
            dead_ghost_speed_multiplier: 2.0,
            ..GameConfig::default()
        };
        assert!(matches!(validate(&config), Err(ConfigError::Invalid(_))));

        let config = GameConfig {
            ghost_count: 0,
            ..GameConfig::default()
        };
        assert!(matches!(validate(&config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let path = temp_file("config-malformed");
        fs::write(&path, "{not json").expect("write file");
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = temp_file("config-missing");
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Io { .. })));
    }
}
