//! Configuration file support for Steplift
//!
//! Loads project-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.stepliftrc.json` in project root
//! 3. `steplift.config.json` in project root
//!
//! All fields are optional.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Corpus patterns applied when no include is configured
const DEFAULT_INCLUDES: &[&str] = &["**/scenarios/**/*.py"];

/// Default exclude patterns applied when no config is specified
const DEFAULT_EXCLUDES: &[&str] = &[
    "**/.venv/**",
    "**/venv/**",
    "**/__pycache__/**",
    "**/.tox/**",
    "**/site-packages/**",
    "**/node_modules/**",
];

/// Step kinds recognised when none are configured
pub const DEFAULT_STEP_KINDS: &[&str] = &["given", "when", "then", "and"];

/// Steplift configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepliftConfig {
    /// Glob patterns selecting corpus files (default: `**/scenarios/**/*.py`)
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns for files to exclude (default: virtualenvs and caches)
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Step kind prefixes (default: given, when, then, and)
    #[serde(default)]
    pub step_kinds: Vec<String>,

    /// Persist scan results between CLI runs (default: true)
    #[serde(default)]
    pub cache: Option<bool>,
}

/// Resolved configuration with compiled glob patterns
#[derive(Debug)]
pub struct ResolvedConfig {
    /// Compiled include patterns
    pub include: GlobSet,
    /// Compiled exclude patterns
    pub exclude: GlobSet,
    /// Whether custom include patterns were configured
    pub custom_include: bool,
    /// Whether custom exclude patterns were configured
    pub custom_exclude: bool,
    /// Step kind prefixes, in configured order
    pub step_kinds: Vec<String>,
    /// Persist scan results between runs
    pub cache_enabled: bool,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl StepliftConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for kind in &self.step_kinds {
            if !is_identifier(kind) {
                anyhow::bail!(
                    "step_kinds entries must be identifiers (got {:?})",
                    kind
                );
            }
            if !seen.insert(kind.as_str()) {
                anyhow::bail!("step_kinds contains duplicate kind {:?}", kind);
            }
        }

        // Validate glob patterns compile
        for pattern in &self.include {
            Glob::new(pattern).with_context(|| format!("invalid include pattern: {}", pattern))?;
        }
        for pattern in &self.exclude {
            Glob::new(pattern).with_context(|| format!("invalid exclude pattern: {}", pattern))?;
        }

        Ok(())
    }

    /// Resolve config into compiled form ready for use
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let include = if self.include.is_empty() {
            build_globset(DEFAULT_INCLUDES.iter().copied())?
        } else {
            build_globset(self.include.iter().map(String::as_str))?
        };

        // Defaults apply only when the user didn't specify any excludes
        let exclude = if self.exclude.is_empty() {
            build_globset(DEFAULT_EXCLUDES.iter().copied())?
        } else {
            build_globset(self.exclude.iter().map(String::as_str))?
        };

        let step_kinds = if self.step_kinds.is_empty() {
            DEFAULT_STEP_KINDS.iter().map(|k| k.to_string()).collect()
        } else {
            self.step_kinds.clone()
        };

        Ok(ResolvedConfig {
            include,
            exclude,
            custom_include: !self.include.is_empty(),
            custom_exclude: !self.exclude.is_empty(),
            step_kinds,
            cache_enabled: self.cache.unwrap_or(true),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Check if a corpus-relative path should be scanned
    pub fn should_include(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy().replace('\\', "/");

        // Check exclude first
        if self.exclude.is_match(path_str.as_str()) {
            return false;
        }

        self.include.is_match(path_str.as_str())
    }

    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        StepliftConfig::default().resolve()
    }
}

fn build_globset<'a>(patterns: impl Iterator<Item = &'a str>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

fn is_identifier(kind: &str) -> bool {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Discover and load a config file from the project root
///
/// Search order:
/// 1. `.stepliftrc.json`
/// 2. `steplift.config.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(StepliftConfig, PathBuf)>> {
    for name in [".stepliftrc.json", "steplift.config.json"] {
        let path = project_root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<StepliftConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: StepliftConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config for a project
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from the project root.
/// Returns default config if nothing is found.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (StepliftConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}
