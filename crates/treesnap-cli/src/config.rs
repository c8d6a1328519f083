use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use treesnap_index::SnapshotConfig;

/// Settings read from the optional `--config` TOML file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub snapshot: SnapshotConfig,
}

impl CliConfig {
    /// Load the file at `path`, or defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Snapshot settings with command-line overrides applied.
    pub fn snapshot_config(&self, workers: Option<usize>) -> SnapshotConfig {
        match workers {
            Some(n) => self.snapshot.clone().with_parallelism(n),
            None => self.snapshot.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_file_means_defaults() {
        assert_eq!(CliConfig::load(None).unwrap(), CliConfig::default());
    }

    #[test]
    fn parse_snapshot_table() {
        let c = CliConfig::parse("[snapshot]\nparallelism = 6\n").unwrap();
        assert_eq!(c.snapshot.parallelism, 6);
        assert_eq!(c.snapshot.queue_depth, SnapshotConfig::default().queue_depth);
    }

    #[test]
    fn workers_flag_overrides_file() {
        let c = CliConfig::parse("[snapshot]\nparallelism = 6\n").unwrap();
        assert_eq!(c.snapshot_config(Some(2)).parallelism, 2);
        assert_eq!(c.snapshot_config(None).parallelism, 6);
    }

    #[test]
    fn bad_toml_is_rejected() {
        assert!(CliConfig::parse("[snapshot\n").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("treesnap.toml");
        std::fs::write(&path, "[snapshot]\nqueue_depth = 16\n").unwrap();

        let c = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(c.snapshot.queue_depth, 16);
    }
}
