use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::BuildTarget;
use crate::constants::defaults;

/// Script and optional icon for one target, as stored in the presets file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl TargetSpec {
    pub fn into_target(self, name: &str) -> BuildTarget {
        BuildTarget {
            name: name.to_string(),
            script: PathBuf::from(self.script),
            icon: self.icon.map(PathBuf::from),
        }
    }
}

impl std::fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.icon {
            Some(icon) => write!(f, "{} (icon: {})", self.script, icon),
            None => write!(f, "{}", self.script),
        }
    }
}

pub fn get_preset_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(defaults::PRESET_FILE_NAME)
}

pub fn load_presets(project_dir: &Path) -> Result<HashMap<String, TargetSpec>> {
    let preset_file = get_preset_file_path(project_dir);

    if !preset_file.exists() {
        return Ok(HashMap::new());
    }

    let content = std::fs::read_to_string(&preset_file)?;
    let presets: HashMap<String, TargetSpec> = serde_json::from_str(&content).map_err(|e| {
        anyhow::anyhow!("Invalid presets file {}: {}", preset_file.display(), e)
    })?;

    Ok(presets)
}

pub fn save_presets(project_dir: &Path, presets: &HashMap<String, TargetSpec>) -> Result<()> {
    let preset_file = get_preset_file_path(project_dir);
    let content = serde_json::to_string_pretty(presets)?;
    std::fs::write(&preset_file, content)?;
    Ok(())
}

pub fn get_builtin_presets() -> HashMap<String, TargetSpec> {
    let mut presets = HashMap::new();

    presets.insert(
        "main".to_string(),
        TargetSpec {
            script: defaults::MAIN_SCRIPT.to_string(),
            icon: None,
        },
    );
    presets.insert(
        "capture-app".to_string(),
        TargetSpec {
            script: defaults::CAPTURE_APP_SCRIPT.to_string(),
            icon: Some(defaults::CAPTURE_APP_ICON.to_string()),
        },
    );

    presets
}

pub fn get_all_presets(project_dir: &Path) -> Result<HashMap<String, TargetSpec>> {
    let mut all_presets = get_builtin_presets();
    let custom_presets = load_presets(project_dir)?;

    // Custom presets override built-in ones
    all_presets.extend(custom_presets);

    Ok(all_presets)
}

/// Parses `script[,icon]`, e.g. `capture_app.py,icon.ico`.
pub fn parse_target_spec(spec_str: &str) -> Option<TargetSpec> {
    let mut parts = spec_str.splitn(2, ',').map(str::trim);

    let script = parts.next().filter(|s| !s.is_empty())?;
    let has_script_ext = Path::new(script)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| defaults::SCRIPT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
    if !has_script_ext {
        return None;
    }

    let icon = match parts.next() {
        Some("") => return None,
        Some(icon) => Some(icon.to_string()),
        None => None,
    };

    Some(TargetSpec {
        script: script.to_string(),
        icon,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_presets_match_wrappers() {
        let presets = get_builtin_presets();
        assert_eq!(presets["main"].script, "main.py");
        assert_eq!(presets["main"].icon, None);
        assert_eq!(presets["capture-app"].script, "capture_app.py");
        assert_eq!(presets["capture-app"].icon.as_deref(), Some("icon.ico"));
    }

    #[test]
    fn test_parse_target_spec() {
        assert_eq!(
            parse_target_spec("capture_app.py, icon.ico"),
            Some(TargetSpec {
                script: "capture_app.py".into(),
                icon: Some("icon.ico".into()),
            })
        );
        assert_eq!(
            parse_target_spec("tools/gui.pyw").map(|s| s.icon),
            Some(None)
        );
        assert_eq!(parse_target_spec(""), None);
        assert_eq!(parse_target_spec("main.rs"), None);
        assert_eq!(parse_target_spec("main.py,"), None);
    }

    #[test]
    fn test_missing_preset_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(load_presets(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_custom_presets_override_builtin() {
        let dir = TempDir::new().unwrap();
        let mut custom = HashMap::new();
        custom.insert(
            "main".to_string(),
            TargetSpec {
                script: "app.py".into(),
                icon: Some("app.ico".into()),
            },
        );
        save_presets(dir.path(), &custom).unwrap();

        let all = get_all_presets(dir.path()).unwrap();
        assert_eq!(all["main"].script, "app.py");
        assert_eq!(all["capture-app"].script, "capture_app.py");
    }

    #[test]
    fn test_corrupt_preset_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(get_preset_file_path(dir.path()), "not json").unwrap();
        assert!(load_presets(dir.path()).is_err());
    }
}
