use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::AppPaths;

use super::types::{ContentDiscoveryError, ContentRequest};

pub(crate) const BASE_MOD_ID: &str = "base";

#[derive(Debug, Clone)]
pub(crate) struct ModSource {
    pub mod_id: String,
    pub source_dir: PathBuf,
}

/// Base content always loads first; enabled mods follow in request order.
pub(crate) fn discover_mod_sources(
    app_paths: &AppPaths,
    request: &ContentRequest,
) -> Result<Vec<ModSource>, ContentDiscoveryError> {
    let mut seen = HashSet::<String>::new();
    let mut sources = vec![ModSource {
        mod_id: BASE_MOD_ID.to_string(),
        source_dir: app_paths.base_content_dir.clone(),
    }];

    for mod_id in &request.enabled_mods {
        let trimmed = mod_id.trim();
        if trimmed.is_empty() {
            return Err(ContentDiscoveryError::EmptyEnabledMod);
        }
        if !seen.insert(trimmed.to_string()) {
            return Err(ContentDiscoveryError::DuplicateEnabledMod {
                mod_id: trimmed.to_string(),
            });
        }
        let mod_dir = app_paths.mods_dir.join(trimmed);
        ensure_dir_exists(trimmed, &mod_dir)?;
        sources.push(ModSource {
            mod_id: trimmed.to_string(),
            source_dir: mod_dir,
        });
    }

    Ok(sources)
}

fn ensure_dir_exists(mod_id: &str, path: &Path) -> Result<(), ContentDiscoveryError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ContentDiscoveryError::EnabledModMissing {
            mod_id: mod_id.to_string(),
            expected_dir: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn app_paths(root: &Path) -> AppPaths {
        AppPaths {
            root: root.to_path_buf(),
            base_content_dir: root.join("assets").join("base"),
            mods_dir: root.join("mods"),
            scenarios_dir: root.join("assets").join("scenarios"),
        }
    }

    #[test]
    fn base_is_first_then_enabled_order() {
        let temp = TempDir::new().expect("tempdir");
        let root = temp.path();
        fs::create_dir_all(root.join("assets").join("base")).expect("create base");
        fs::create_dir_all(root.join("mods").join("b")).expect("create mod b");
        fs::create_dir_all(root.join("mods").join("a")).expect("create mod a");

        let sources = discover_mod_sources(&app_paths(root), &ContentRequest::with_mods(["b", "a"]))
            .expect("discover");
        let ids = sources
            .iter()
            .map(|source| source.mod_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["base", "b", "a"]);
    }

    #[test]
    fn duplicate_and_missing_mods_are_rejected() {
        let temp = TempDir::new().expect("tempdir");
        let root = temp.path();
        fs::create_dir_all(root.join("mods").join("a")).expect("create mod a");

        let duplicate = discover_mod_sources(&app_paths(root), &ContentRequest::with_mods(["a", " a "]))
            .expect_err("duplicate");
        assert!(matches!(
            duplicate,
            ContentDiscoveryError::DuplicateEnabledMod { .. }
        ));

        let missing = discover_mod_sources(&app_paths(root), &ContentRequest::with_mods(["ghost"]))
            .expect_err("missing");
        assert!(matches!(
            missing,
            ContentDiscoveryError::EnabledModMissing { .. }
        ));

        let empty = discover_mod_sources(&app_paths(root), &ContentRequest::with_mods(["  "]))
            .expect_err("empty");
        assert!(matches!(empty, ContentDiscoveryError::EmptyEnabledMod));
    }
}
