use std::path::PathBuf;

use engine::{resolve_app_paths, ContentRequest, LoopConfig, Scene};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay;

const ENABLED_MODS_ENV_VAR: &str = "QUESTBOUND_ENABLED_MODS";
const SCENARIO_ENV_VAR: &str = "QUESTBOUND_SCENARIO";
const DEFAULT_SCENARIO: &str = "village";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Questbound Startup ===");

    let scenario_name = scenario_name_from(std::env::var(SCENARIO_ENV_VAR).ok());
    let scene = gameplay::build_scene(&scenario_name, scenario_path(&scenario_name));
    let config = LoopConfig {
        content_request: ContentRequest::with_mods(parse_enabled_mods(
            std::env::var(ENABLED_MODS_ENV_VAR).ok(),
        )),
        ..LoopConfig::default()
    };

    AppWiring { config, scene }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn scenario_path(scenario_name: &str) -> Option<PathBuf> {
    match resolve_app_paths() {
        Ok(paths) => Some(paths.scenarios_dir.join(format!("{scenario_name}.json"))),
        Err(error) => {
            warn!(error = %error, "scenario_dir_unresolved");
            None
        }
    }
}

fn scenario_name_from(raw: Option<String>) -> String {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_SCENARIO.to_string())
}

fn parse_enabled_mods(raw: Option<String>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(ToString::to_string)
            .collect::<Vec<_>>()
    })
    .unwrap_or_default()
}
