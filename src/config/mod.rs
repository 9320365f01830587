use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_yml::Value;

use crate::cop::CopConfig;
use crate::diagnostic::Severity;

/// Resolved configuration from .rubocop.yml.
///
/// Reads a single YAML file and extracts AllCops.Exclude plus per-cop
/// Enabled/Severity/Include/Exclude/AutoCorrect. Other cop keys are kept as
/// opaque options. No inherit_from resolution.
#[derive(Debug)]
pub struct ResolvedConfig {
    /// The file this config was read from, if any.
    config_path: Option<PathBuf>,
    /// Per-cop configs keyed by cop name (e.g. "Layout/SpaceAroundMethodCallOperator")
    cop_configs: HashMap<String, CopConfig>,
    /// Compiled Include/Exclude globs, same keys as `cop_configs`.
    cop_filters: HashMap<String, CopFilter>,
    global_excludes: Vec<String>,
    global_exclude_set: Option<GlobSet>,
}

/// Compiled per-cop path filter.
#[derive(Debug)]
struct CopFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl CopFilter {
    fn new(config: &CopConfig) -> Result<Self> {
        Ok(Self {
            include: build_glob_set(&config.include)?,
            exclude: build_glob_set(&config.exclude)?,
        })
    }

    fn matches(&self, path: &Path) -> bool {
        if let Some(include) = &self.include {
            if !include.is_match(path) {
                return false;
            }
        }
        !self.exclude.as_ref().is_some_and(|ex| ex.is_match(path))
    }
}

fn build_glob_set(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;
        builder.add(glob);
    }
    let set = builder.build().context("failed to build glob set")?;
    Ok(Some(set))
}

impl ResolvedConfig {
    fn empty() -> Self {
        Self {
            config_path: None,
            cop_configs: HashMap::new(),
            cop_filters: HashMap::new(),
            global_excludes: Vec::new(),
            global_exclude_set: None,
        }
    }
}

/// Load config from the given path, or look for `.rubocop.yml` in
/// `target_dir` (falling back to the current directory). Returns an empty
/// config if the file doesn't exist.
pub fn load_config(path: Option<&Path>, target_dir: Option<&Path>) -> Result<ResolvedConfig> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => target_dir
            .unwrap_or_else(|| Path::new("."))
            .join(".rubocop.yml"),
    };

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "no config file found, using defaults");
        return Ok(ResolvedConfig::empty());
    }

    let contents = std::fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read config {}", config_path.display()))?;
    let mut config = parse_config(&contents)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    config.config_path = Some(config_path);
    Ok(config)
}

/// Parse YAML config text. An empty document yields the default config.
pub fn parse_config(contents: &str) -> Result<ResolvedConfig> {
    let raw: Value = serde_yml::from_str(contents).context("invalid YAML")?;

    let mut config = ResolvedConfig::empty();
    let Value::Mapping(map) = &raw else {
        return Ok(config);
    };

    for (key, value) in map {
        let Some(key_str) = key.as_str() else {
            continue;
        };

        if key_str == "AllCops" {
            if let Some(excludes) = extract_string_list(value, "Exclude") {
                config.global_exclude_set =
                    build_glob_set(&excludes).context("in AllCops.Exclude")?;
                config.global_excludes = excludes;
            }
            continue;
        }

        // Cop names contain "/" (e.g. "Layout/SpaceAroundMethodCallOperator")
        if key_str.contains('/') {
            let cop_config = parse_cop_config(value);
            let filter = CopFilter::new(&cop_config)
                .with_context(|| format!("in {key_str} Include/Exclude"))?;
            config.cop_filters.insert(key_str.to_string(), filter);
            config.cop_configs.insert(key_str.to_string(), cop_config);
        }
    }

    Ok(config)
}

impl ResolvedConfig {
    /// Check if a cop is enabled for the given file path.
    pub fn is_cop_enabled(&self, name: &str, path: &Path) -> bool {
        match self.cop_configs.get(name) {
            Some(config) if !config.enabled => false,
            Some(_) => self
                .cop_filters
                .get(name)
                .is_none_or(|filter| filter.matches(&self.relative_path(path))),
            None => true, // enabled by default
        }
    }

    /// Get the resolved config for a specific cop.
    pub fn cop_config(&self, name: &str) -> CopConfig {
        self.cop_configs.get(name).cloned().unwrap_or_default()
    }

    /// Global exclude patterns from AllCops.Exclude.
    pub fn global_excludes(&self) -> &[String] {
        &self.global_excludes
    }

    /// Whether AllCops.Exclude matches `path`.
    pub fn is_globally_excluded(&self, path: &Path) -> bool {
        self.global_exclude_set
            .as_ref()
            .is_some_and(|set| set.is_match(self.relative_path(path)))
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Directory that relative patterns are resolved against.
    pub fn base_dir(&self) -> Option<&Path> {
        self.config_path.as_deref().and_then(Path::parent)
    }

    /// `path` relative to the config directory, with any leading `./`
    /// removed, for glob matching.
    fn relative_path(&self, path: &Path) -> PathBuf {
        let path = self
            .base_dir()
            .filter(|base| !base.as_os_str().is_empty())
            .and_then(|base| path.strip_prefix(base).ok())
            .unwrap_or(path);
        path.strip_prefix(".").unwrap_or(path).to_path_buf()
    }
}

fn parse_cop_config(value: &Value) -> CopConfig {
    let mut config = CopConfig::default();

    let Value::Mapping(map) = value else {
        return config;
    };
    for (k, v) in map {
        let Some(key) = k.as_str() else {
            continue;
        };
        match key {
            "Enabled" => {
                if let Some(b) = v.as_bool() {
                    config.enabled = b;
                }
            }
            "Severity" => {
                let parsed = v.as_str().and_then(Severity::from_str);
                if parsed.is_none() {
                    tracing::warn!(value = ?v, "ignoring unknown Severity");
                }
                config.severity = parsed;
            }
            "Exclude" => {
                if let Some(list) = value_to_string_list(v) {
                    config.exclude = list;
                }
            }
            "Include" => {
                if let Some(list) = value_to_string_list(v) {
                    config.include = list;
                }
            }
            "AutoCorrect" => {
                if let Some(b) = v.as_bool() {
                    config.autocorrect = b;
                }
            }
            _ => {
                config.options.insert(key.to_string(), v.clone());
            }
        }
    }

    config
}

fn extract_string_list(value: &Value, key: &str) -> Option<Vec<String>> {
    value_to_string_list(value.as_mapping()?.get(&Value::String(key.to_string()))?)
}

fn value_to_string_list(value: &Value) -> Option<Vec<String>> {
    value.as_sequence().map(|seq| {
        seq.iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect()
    })
}
