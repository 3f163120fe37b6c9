use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod animation;
pub mod app;
pub mod content;
pub mod physics;
pub mod signal;

pub use animation::{AnimationClip, Animator};
pub use app::{
    run_app, screen_rect_for_box, world_to_screen, AppError, Camera2D, Entity, EntityId,
    EntityIdAllocator, FrameClock, FrameTime, InputAction, InputSnapshot, LoopConfig,
    RenderableDesc, RenderableKind, Renderer, Scene, SceneCommand, SceneWorld, Transform, Vec2,
    Viewport, PIXELS_PER_WORLD,
};
pub use content::{
    compile_def_database, CharacterDef, CharacterDefId, ContentCompileError,
    ContentDiscoveryError, ContentErrorCode, ContentRequest, DefDatabase, EventDef,
    SourceLocation,
};
pub use physics::{
    Aabb, LayerId, LayerMask, LayerRegistry, ObstacleQuery, PhysicsWorld, TriggerEvent,
    TriggerEventKind, DEFAULT_LAYER, MAP_LAYER, OBSTACLE_LAYER,
};
pub use signal::{FlagChange, ObservableBool, Subscribers};

pub const ROOT_ENV_VAR: &str = "QUESTBOUND_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub base_content_dir: PathBuf,
    pub mods_dir: PathBuf,
    pub scenarios_dir: PathBuf,
}

impl AppPaths {
    pub fn from_root(root: PathBuf) -> Self {
        let assets = root.join("assets");
        Self {
            base_content_dir: assets.join("base"),
            mods_dir: root.join("mods"),
            scenarios_dir: assets.join("scenarios"),
            root,
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "QUESTBOUND_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/questbound\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    resolve_root().map(AppPaths::from_root)
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let temp = TempDir::new().expect("temp");
        fs::create_dir_all(temp.path().join("assets")).expect("assets");
        assert!(!is_repo_marker(temp.path()));

        fs::write(temp.path().join("Cargo.toml"), "[workspace]\n").expect("write");
        assert!(is_repo_marker(temp.path()));
    }

    #[test]
    fn app_paths_layout_hangs_off_root() {
        let paths = AppPaths::from_root(PathBuf::from("/game"));
        assert_eq!(paths.base_content_dir, Path::new("/game/assets/base"));
        assert_eq!(paths.mods_dir, Path::new("/game/mods"));
        assert_eq!(paths.scenarios_dir, Path::new("/game/assets/scenarios"));
    }
}
