use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;

use crate::config::ResolvedConfig;

/// Files to lint, plus the subset named directly on the command line.
///
/// Explicitly named files skip AllCops.Exclude unless `--force-exclusion`
/// is given, so the linter needs to know which ones they were.
#[derive(Debug, Default)]
pub struct DiscoveredFiles {
    pub files: Vec<PathBuf>,
    pub explicit: HashSet<PathBuf>,
}

impl DiscoveredFiles {
    pub fn is_explicit(&self, path: &Path) -> bool {
        self.explicit.contains(path)
    }
}

/// Discover Ruby files from the given paths, respecting .gitignore
/// and AllCops.Exclude patterns.
pub fn discover_files(paths: &[PathBuf], config: &ResolvedConfig) -> Result<DiscoveredFiles> {
    let mut discovered = DiscoveredFiles::default();

    for path in paths {
        if path.is_file() {
            // Direct file paths bypass extension filtering
            discovered.files.push(path.clone());
            discovered.explicit.insert(path.clone());
        } else if path.is_dir() {
            let dir_files = walk_directory(path, config)?;
            tracing::debug!(dir = %path.display(), count = dir_files.len(), "walked directory");
            discovered.files.extend(dir_files);
        } else {
            anyhow::bail!("path does not exist: {}", path.display());
        }
    }

    discovered.files.sort();
    discovered.files.dedup();
    Ok(discovered)
}

fn walk_directory(dir: &Path, config: &ResolvedConfig) -> Result<Vec<PathBuf>> {
    let mut builder = WalkBuilder::new(dir);
    builder.hidden(true).git_ignore(true).git_global(true);

    // AllCops.Exclude patterns are relative to the config file's directory.
    let global_excludes = config.global_excludes();
    if !global_excludes.is_empty() {
        let root = config
            .base_dir()
            .filter(|base| !base.as_os_str().is_empty())
            .unwrap_or(dir);
        let mut overrides = OverrideBuilder::new(root);
        for pattern in global_excludes {
            // ignore crate overrides: prefix with ! to exclude
            overrides
                .add(&format!("!{pattern}"))
                .with_context(|| format!("invalid exclude pattern: {pattern}"))?;
        }
        let overrides = overrides.build().context("failed to build overrides")?;
        builder.overrides(overrides);
    }

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = entry.context("error walking directory")?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "rb") {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}
