//! Configuration types for seqsmith
//!
//! Settings come from an optional TOML file
//! (`~/.config/seqsmith/config.toml`), with environment variables taking
//! precedence over the file.

use crate::SeqsmithError;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Overrides for external binary locations. Unset entries fall back to a
/// PATH search at call time.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsConfig {
    #[serde(default)]
    pub blastp: Option<String>,
    #[serde(default)]
    pub blastn: Option<String>,
    #[serde(default)]
    pub blastdbcmd: Option<String>,
    #[serde(default)]
    pub raxml: Option<String>,
    #[serde(default)]
    pub phyml: Option<String>,
    #[serde(default)]
    pub fasttree: Option<String>,
    /// Root for temp workspaces created around subprocess runs
    #[serde(default)]
    pub workspace_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Residues per line when writing wrapped formats
    #[serde(default = "default_wrap_width")]
    pub wrap_width: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            wrap_width: default_wrap_width(),
        }
    }
}

fn default_wrap_width() -> usize {
    80
}

static GLOBAL_CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    /// Load configuration from a specific TOML file
    pub fn from_file(path: &Path) -> Result<Self, SeqsmithError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| SeqsmithError::Configuration(format!("{}: {}", path.display(), e)))
    }

    /// Load from the default location, falling back to defaults when the
    /// file does not exist. Environment variables (SEQSMITH_BLASTP etc.)
    /// override file values.
    pub fn load() -> Self {
        let mut config = Self::default_location()
            .filter(|p| p.is_file())
            .and_then(|p| Config::from_file(&p).ok())
            .unwrap_or_default();
        config.apply_env();
        config
    }

    /// The process-wide configuration, loaded once.
    pub fn global() -> &'static Config {
        GLOBAL_CONFIG.get_or_init(Config::load)
    }

    fn default_location() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("seqsmith").join("config.toml"))
    }

    fn apply_env(&mut self) {
        let overrides = [
            ("SEQSMITH_BLASTP", &mut self.tools.blastp),
            ("SEQSMITH_BLASTN", &mut self.tools.blastn),
            ("SEQSMITH_BLASTDBCMD", &mut self.tools.blastdbcmd),
            ("SEQSMITH_RAXML", &mut self.tools.raxml),
            ("SEQSMITH_PHYML", &mut self.tools.phyml),
            ("SEQSMITH_FASTTREE", &mut self.tools.fasttree),
            ("SEQSMITH_WORKSPACE", &mut self.tools.workspace_dir),
        ];
        for (var, slot) in overrides {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    *slot = Some(value);
                }
            }
        }
    }

    /// Root directory for temp workspaces.
    pub fn workspace_dir(&self) -> PathBuf {
        self.tools
            .workspace_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir)
    }
}
