use std::fs;
use std::path::{Path, PathBuf};

use engine::{LayerRegistry, Vec2, MAP_LAYER};
use serde::Deserialize;
use thiserror::Error;

pub(crate) const DEFAULT_PLAYER_DEF: &str = "player.knight";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    pub player: ActorPlacement,
    #[serde(default)]
    pub npcs: Vec<NpcPlacement>,
    #[serde(default)]
    pub obstacles: Vec<ObstaclePlacement>,
    #[serde(default)]
    pub items: Vec<ItemPlacement>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ActorPlacement {
    pub def: String,
    pub spawn: Vec2,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct NpcPlacement {
    pub def: String,
    pub spawn: Vec2,
    #[serde(default = "default_trigger_radius")]
    pub trigger_radius: f32,
    /// Half-width of the pacing route; `None` keeps the NPC in place.
    #[serde(default)]
    pub wander: Option<f32>,
    #[serde(default = "default_physics")]
    pub physics: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ObstaclePlacement {
    pub center: Vec2,
    pub half_extents: Vec2,
    pub layer: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ItemPlacement {
    pub tag: String,
    pub position: Vec2,
    #[serde(default = "default_item_radius")]
    pub radius: f32,
}

fn default_trigger_radius() -> f32 {
    1.5
}

fn default_item_radius() -> f32 {
    0.5
}

fn default_physics() -> bool {
    true
}

#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid scenario {path} at {field}: {message}")]
    Invalid {
        path: PathBuf,
        field: String,
        message: String,
    },
}

pub(crate) fn load_scenario(path: &Path, layers: &LayerRegistry) -> Result<Scenario, ScenarioError> {
    let raw = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let scenario = parse_scenario_json(path, &raw)?;
    validate_scenario(path, &scenario, layers)?;
    Ok(scenario)
}

fn parse_scenario_json(path: &Path, raw: &str) -> Result<Scenario, ScenarioError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, Scenario>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        ScenarioError::Parse {
            path: path.to_path_buf(),
            json_path: if json_path.is_empty() {
                ".".to_string()
            } else {
                json_path
            },
            source: error.into_inner(),
        }
    })
}

fn validate_scenario(path: &Path, scenario: &Scenario, layers: &LayerRegistry) -> Result<(), ScenarioError> {
    let invalid = |field: String, message: &str| ScenarioError::Invalid {
        path: path.to_path_buf(),
        field,
        message: message.to_string(),
    };

    if scenario.player.def.trim().is_empty() {
        return Err(invalid("player.def".to_string(), "must not be empty"));
    }
    if !scenario.player.spawn.is_finite() {
        return Err(invalid("player.spawn".to_string(), "must be finite"));
    }
    for (index, npc) in scenario.npcs.iter().enumerate() {
        if npc.def.trim().is_empty() {
            return Err(invalid(format!("npcs[{index}].def"), "must not be empty"));
        }
        if !npc.spawn.is_finite() {
            return Err(invalid(format!("npcs[{index}].spawn"), "must be finite"));
        }
        if !npc.trigger_radius.is_finite() || npc.trigger_radius <= 0.0 {
            return Err(invalid(format!("npcs[{index}].trigger_radius"), "must be > 0"));
        }
        if npc.wander.is_some_and(|offset| !offset.is_finite() || offset <= 0.0) {
            return Err(invalid(format!("npcs[{index}].wander"), "must be > 0"));
        }
    }
    for (index, obstacle) in scenario.obstacles.iter().enumerate() {
        if !obstacle.center.is_finite() {
            return Err(invalid(format!("obstacles[{index}].center"), "must be finite"));
        }
        let extents = obstacle.half_extents;
        if !extents.is_finite() || extents.x <= 0.0 || extents.y <= 0.0 {
            return Err(invalid(
                format!("obstacles[{index}].half_extents"),
                "must be finite and > 0",
            ));
        }
        if layers.name_to_layer(&obstacle.layer).is_none() {
            return Err(invalid(format!("obstacles[{index}].layer"), "unknown layer"));
        }
    }
    for (index, item) in scenario.items.iter().enumerate() {
        if item.tag.trim().is_empty() {
            return Err(invalid(format!("items[{index}].tag"), "must not be empty"));
        }
        if !item.position.is_finite() {
            return Err(invalid(format!("items[{index}].position"), "must be finite"));
        }
        if !item.radius.is_finite() || item.radius <= 0.0 {
            return Err(invalid(format!("items[{index}].radius"), "must be > 0"));
        }
    }
    Ok(())
}

impl Scenario {
    /// Walled yard with only the player, used when no scenario file loads.
    pub(crate) fn fallback() -> Self {
        let wall = |center: Vec2, half_extents: Vec2| ObstaclePlacement {
            center,
            half_extents,
            layer: MAP_LAYER.to_string(),
        };
        Self {
            player: ActorPlacement {
                def: DEFAULT_PLAYER_DEF.to_string(),
                spawn: Vec2::ZERO,
            },
            npcs: Vec::new(),
            obstacles: vec![
                wall(Vec2::new(0.0, 5.0), Vec2::new(8.0, 0.5)),
                wall(Vec2::new(0.0, -5.0), Vec2::new(8.0, 0.5)),
                wall(Vec2::new(-8.0, 0.0), Vec2::new(0.5, 5.0)),
                wall(Vec2::new(8.0, 0.0), Vec2::new(0.5, 5.0)),
            ],
            items: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const VALID: &str = r#"{
        "player": { "def": "player.knight", "spawn": { "x": 0.0, "y": 0.0 } },
        "npcs": [
            { "def": "npc.elder", "spawn": { "x": 3.0, "y": 0.0 }, "wander": 1.5 }
        ],
        "obstacles": [
            { "center": { "x": 0.0, "y": 4.0 }, "half_extents": { "x": 5.0, "y": 0.5 }, "layer": "Map" }
        ],
        "items": [ { "tag": "herb", "position": { "x": -2.0, "y": 1.0 } } ]
    }"#;

    fn write_scenario(raw: &str) -> (TempDir, PathBuf) {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("village.json");
        fs::write(&path, raw).expect("write");
        (temp, path)
    }

    #[test]
    fn valid_scenario_loads_with_defaults() {
        let (_temp, path) = write_scenario(VALID);
        let scenario = load_scenario(&path, &LayerRegistry::default()).expect("load");
        assert_eq!(scenario.npcs.len(), 1);
        assert_eq!(scenario.npcs[0].trigger_radius, 1.5);
        assert!(scenario.npcs[0].physics);
        assert_eq!(scenario.items[0].radius, 0.5);
    }

    #[test]
    fn parse_error_reports_json_path() {
        let (_temp, path) = write_scenario(
            r#"{ "player": { "def": "p", "spawn": { "x": "left", "y": 0.0 } } }"#,
        );
        let error = load_scenario(&path, &LayerRegistry::default()).expect_err("error");
        match error {
            ScenarioError::Parse { json_path, .. } => assert_eq!(json_path, "player.spawn.x"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn unknown_field_is_rejected() {
        let (_temp, path) = write_scenario(
            r#"{ "player": { "def": "p", "spawn": { "x": 0.0, "y": 0.0 }, "hat": true } }"#,
        );
        let error = load_scenario(&path, &LayerRegistry::default()).expect_err("error");
        assert!(matches!(error, ScenarioError::Parse { .. }));
    }

    #[test]
    fn unknown_layer_is_invalid() {
        let (_temp, path) = write_scenario(
            r#"{
                "player": { "def": "p", "spawn": { "x": 0.0, "y": 0.0 } },
                "obstacles": [ { "center": { "x": 0.0, "y": 0.0 }, "half_extents": { "x": 1.0, "y": 1.0 }, "layer": "Lava" } ]
            }"#,
        );
        let error = load_scenario(&path, &LayerRegistry::default()).expect_err("error");
        match error {
            ScenarioError::Invalid { field, .. } => assert_eq!(field, "obstacles[0].layer"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn missing_file_is_read_error() {
        let temp = TempDir::new().expect("temp");
        let error = load_scenario(&temp.path().join("nope.json"), &LayerRegistry::default())
            .expect_err("error");
        assert!(matches!(error, ScenarioError::Read { .. }));
    }

    #[test]
    fn fallback_is_valid() {
        let scenario = Scenario::fallback();
        validate_scenario(Path::new("<fallback>"), &scenario, &LayerRegistry::default())
            .expect("valid");
    }
}
