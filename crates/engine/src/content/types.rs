use std::path::PathBuf;

use thiserror::Error;

/// Which content sources to compile on top of `assets/base`, in load order.
#[derive(Debug, Clone, Default)]
pub struct ContentRequest {
    pub enabled_mods: Vec<String>,
}

impl ContentRequest {
    pub fn with_mods<I, S>(mods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled_mods: mods.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ContentDiscoveryError {
    #[error("enabled mod id cannot be empty")]
    EmptyEnabledMod,
    #[error("duplicate enabled mod id in request: {mod_id}")]
    DuplicateEnabledMod { mod_id: String },
    #[error("enabled mod does not exist on disk: {mod_id} at {expected_dir}")]
    EnabledModMissing {
        mod_id: String,
        expected_dir: PathBuf,
    },
}
