use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::Config;

/// Directory the fetch stage writes to and the staging stage reads from.
pub const DEFAULT_DATA_PATH: &str = "data/raw";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Local,
    Cloud,
    Unconfigured,
}

impl ExecutionMode {
    /// `use_local` wins over cloud credentials.
    pub fn detect(config: &Config) -> ExecutionMode {
        if config.use_local {
            ExecutionMode::Local
        } else if config.has_cloud_credentials() {
            ExecutionMode::Cloud
        } else {
            ExecutionMode::Unconfigured
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExecutionMode::Local => "local",
            ExecutionMode::Cloud => "cloud",
            ExecutionMode::Unconfigured => "unconfigured",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDataPath {
    pub mode: ExecutionMode,
    /// Relative to the pipeline root.
    pub path: PathBuf,
}

/// Picks the directory holding the Parquet batch. Every mode resolves to the same local
/// directory: the bulk engine only reads local files, so cloud mode expects the fetch stage to
/// have mirrored the files there already.
pub fn resolve_data_path(config: &Config, root: &Path) -> ResolvedDataPath {
    let mode = ExecutionMode::detect(config);
    let path = PathBuf::from(DEFAULT_DATA_PATH);
    let shown = root.join(&path);

    match mode {
        ExecutionMode::Local => {
            info!(mode = mode.name(); "Local mode, reading from {}", shown.display());
        }
        ExecutionMode::Cloud => {
            info!(mode = mode.name(); "Cloud mode detected");
            info!(mode = mode.name(); "The bulk engine reads local Parquet files only");
            info!(mode = mode.name(); "Files must have been downloaded by the fetch stage");
            info!(mode = mode.name(); "Reading from {}", shown.display());
        }
        ExecutionMode::Unconfigured => {
            debug!(mode = mode.name(); "No execution mode configured, reading from {}", shown.display());
        }
    }

    ResolvedDataPath { mode, path }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mode_resolves_to_the_default_path() {
        let root = Path::new("");
        let cases = [
            (false, None, ExecutionMode::Unconfigured),
            (true, None, ExecutionMode::Local),
            (false, Some("DefaultEndpointsProtocol=https"), ExecutionMode::Cloud),
            (true, Some("DefaultEndpointsProtocol=https"), ExecutionMode::Local),
        ];

        for (use_local, credential, expected_mode) in cases {
            let config = Config {
                use_local,
                azure_storage_connection_string: credential.map(str::to_string),
                ..Config::default()
            };
            let resolved = resolve_data_path(&config, root);
            assert_eq!(resolved.mode, expected_mode);
            assert_eq!(resolved.path, PathBuf::from("data/raw"));
        }
    }
}
