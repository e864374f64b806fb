//! Runtime configuration.
//!
//! Values come from an optional TOML file, then environment variables
//! (`PVM_IMAGE`, `PVM_TRACE`), then command-line flags.

use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::VmError;
use crate::memory::check_size;
use crate::vm::{DATA_STACK_SIZE, RETURN_STACK_SIZE};

/// Default image size (`Msz`)
pub const DEFAULT_MEMORY_SIZE: usize = 0x1000;

/// Config file picked up from the working directory when none is named
pub const DEFAULT_CONFIG_FILE: &str = "pvm.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VmConfig {
    /// Backing image file
    pub image: PathBuf,
    /// Image size in bytes, fixed when the image is created
    pub memory_size: usize,
    pub return_stack: usize,
    pub data_stack: usize,
    /// Print each executed instruction to stderr
    pub trace: bool,
    /// Stop after this many instructions
    pub instruction_limit: Option<u64>,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            image: PathBuf::from("pvm.img"),
            memory_size: DEFAULT_MEMORY_SIZE,
            return_stack: RETURN_STACK_SIZE,
            data_stack: DATA_STACK_SIZE,
            trace: false,
            instruction_limit: None,
        }
    }
}

impl VmConfig {
    pub fn from_toml(text: &str) -> Result<Self, VmError> {
        let config: VmConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else `pvm.toml` if it exists, else defaults; then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, VmError> {
        let mut config = match path {
            Some(p) => Self::read(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::read(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => VmConfig::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, VmError> {
        debug!("Reading config {:?}", path);
        let text = fs::read_to_string(path)
            .map_err(|e| VmError::Config(format!("cannot read {:?}: {}", path, e)))?;
        Self::from_toml(&text)
    }

    /// Apply `PVM_IMAGE` and `PVM_TRACE` as looked up by `var`
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(image) = var("PVM_IMAGE") {
            self.image = PathBuf::from(image);
        }
        if let Some(trace) = var("PVM_TRACE") {
            self.trace = !matches!(trace.as_str(), "" | "0" | "false");
        }
    }

    pub fn validate(&self) -> Result<(), VmError> {
        check_size(self.memory_size)?;
        if self.return_stack < 2 {
            return Err(VmError::Config(format!(
                "return_stack must be at least 2, got {}",
                self.return_stack
            )));
        }
        if self.data_stack < 2 {
            return Err(VmError::Config(format!(
                "data_stack must be at least 2, got {}",
                self.data_stack
            )));
        }
        Ok(())
    }
}
