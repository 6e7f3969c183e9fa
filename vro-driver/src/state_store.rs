use std::fs;
use std::path::{Path, PathBuf};
use vro_common::ProvisioningState;

use crate::error::Result;

pub const DEFAULT_STATE_FILE: &str = ".vro/state.json";

/// JSON file holding the provisioning state between `create` and `destroy`.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `VRO_STATE_FILE`, or `.vro/state.json` in the working directory.
    pub fn from_env() -> Self {
        let path = std::env::var("VRO_STATE_FILE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is the empty state.
    pub fn load(&self) -> Result<ProvisioningState> {
        if !self.path.exists() {
            return Ok(ProvisioningState::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(ProvisioningState::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, state: &ProvisioningState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
