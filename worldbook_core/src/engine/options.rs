//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use worldbook_model::WorldBookSettings;

/// Errors from loading engine options.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read engine options from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid engine options: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Configuration for the activation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Total token budget of the prompt.
    pub token_budget: usize,

    /// Share of the budget lore may use (0.0-1.0).
    pub context_percent: f64,

    /// Re-scan accepted content for second-order matches.
    pub recursive_scanning: bool,

    /// Maximum recursion depth.
    pub max_recursion_steps: u32,

    pub case_sensitive: bool,

    pub match_whole_words: bool,

    /// Minimum entries per turn; backfilled when recursion is off.
    pub min_activations: usize,

    /// Resolve inclusion groups by score unless an entry says otherwise.
    pub use_group_scoring: bool,

    /// Add the cluster bonus for entries sharing a `group`.
    pub group_bonus: bool,

    /// Trailing chat messages appended to the scan text.
    pub scan_depth: usize,

    /// Seed for the RNG stream. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            token_budget: 2000,
            context_percent: 0.7,
            recursive_scanning: false,
            max_recursion_steps: 3,
            case_sensitive: false,
            match_whole_words: false,
            min_activations: 0,
            use_group_scoring: false,
            group_bonus: true,
            scan_depth: 0,
            seed: None,
        }
    }
}

impl EngineOptions {
    /// Parse options from a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read options from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Set the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Overwrite every field the settings specify.
    pub fn apply(&mut self, settings: &WorldBookSettings) {
        if let Some(v) = settings.token_budget {
            self.token_budget = v;
        }
        if let Some(v) = settings.context_percent {
            self.context_percent = v;
        }
        if let Some(v) = settings.recursive_scanning {
            self.recursive_scanning = v;
        }
        if let Some(v) = settings.max_recursion_steps {
            self.max_recursion_steps = v;
        }
        if let Some(v) = settings.case_sensitive {
            self.case_sensitive = v;
        }
        if let Some(v) = settings.match_whole_words {
            self.match_whole_words = v;
        }
        if let Some(v) = settings.min_activations {
            self.min_activations = v;
        }
        if let Some(v) = settings.use_group_scoring {
            self.use_group_scoring = v;
        }
        if let Some(v) = settings.group_bonus {
            self.group_bonus = v;
        }
        if let Some(v) = settings.scan_depth {
            self.scan_depth = v;
        }
    }

    /// A copy with the book's settings laid over these options.
    pub fn overlaid(&self, settings: Option<&WorldBookSettings>) -> Self {
        let mut effective = self.clone();
        if let Some(settings) = settings {
            effective.apply(settings);
        }
        effective
    }

    /// `context_percent` clamped into `[0, 1]`; non-finite values count as 0.
    pub fn effective_context_percent(&self) -> f64 {
        if self.context_percent.is_finite() {
            self.context_percent.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Token limit for lore: `floor(token_budget × context_percent)`.
    pub fn budget_limit(&self) -> usize {
        (self.token_budget as f64 * self.effective_context_percent()).floor() as usize
    }
}
