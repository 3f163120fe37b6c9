use std::path::PathBuf;

use engine::Scene;

mod character;
mod dialogue;
mod player;
mod rpg_event;
mod scenario;
mod scene;
mod wander;

pub(crate) fn build_scene(scenario_name: &str, scenario_path: Option<PathBuf>) -> Box<dyn Scene> {
    Box::new(scene::GameplayScene::new(scenario_name, scenario_path))
}
