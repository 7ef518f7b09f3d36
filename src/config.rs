//! Recolor settings bundle, persisted as pretty JSON

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use crate::error::Result;
use crate::masks::MaskSettings;
use crate::regions::DetectionSettings;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecolorConfig {
    pub detection: DetectionSettings,
    pub masks: MaskSettings,
}

impl RecolorConfig {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load from disk; missing fields fall back to defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
