//! Preprocessor configuration.
//!
//! Loaded from a YAML file. `${VAR}` references are substituted from the
//! environment before parsing.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use grid_processor::{GridProcessorConfig, ZeroVariancePolicy};
use rasterizer::{Kernel, PostProcess};
use reanalysis::{ChannelSpec, VariableNames};
use storage::ObjectStorageConfig;
use tracks::{TrackColumns, TrackFilter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessorConfig {
    #[serde(default)]
    pub storage: ObjectStorageConfig,

    #[serde(default)]
    pub prefixes: Prefixes,

    pub years: Vec<i32>,

    #[serde(default = "all_months")]
    pub months: Vec<u32>,

    /// Parent of per-unit scratch directories; system temp dir when unset.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,

    /// Units of work running at once.
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub grid: GridConfig,

    #[serde(default)]
    pub inputs: InputsConfig,

    pub tracks: TracksConfig,

    #[serde(default)]
    pub targets: TargetsConfig,

    #[serde(default)]
    pub dataset: DatasetConfig,
}

/// Object key prefixes for each kind of file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prefixes {
    pub raw: String,
    pub inputs: String,
    pub targets: String,
    pub datasets: String,
}

impl Default for Prefixes {
    fn default() -> Self {
        Self {
            raw: "era5".to_string(),
            inputs: "inputs".to_string(),
            targets: "targets".to_string(),
            datasets: "datasets".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub n_lat: usize,
    pub n_lon: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            n_lat: cyclone_common::GLOBAL_LAT_POINTS,
            n_lon: cyclone_common::GLOBAL_LON_POINTS,
        }
    }
}

/// Raw reanalysis variables and the channels taken from them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    pub variables: VariableNames,
    pub channels: ChannelSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracksConfig {
    /// Object key of the track table.
    pub key: String,
    #[serde(default)]
    pub columns: TrackColumns,
    #[serde(default)]
    pub filter: TrackFilter,
}

/// File format for target maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapFormat {
    /// Compressed archive with the maps under key `maps`.
    #[default]
    Npz,
    Npy,
}

impl MapFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            MapFormat::Npz => "npz",
            MapFormat::Npy => "npy",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetsConfig {
    pub kernel: Kernel,
    pub postprocess: PostProcess,
    pub format: MapFormat,
}

/// Dataset transform chain and store layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Latitude rows removed at the north pole.
    pub trim_north: usize,
    /// Latitude rows removed at the south pole.
    pub trim_south: usize,
    /// Input channels negated in the southern hemisphere.
    pub negate_channels: Vec<usize>,
    pub block_h: usize,
    pub block_w: usize,
    /// Time slices per input chunk.
    pub chunk_len: u64,
    pub zero_variance: ZeroVariancePolicy,
    pub store: GridProcessorConfig,
    /// Months produced ahead of the writer.
    pub prefetch: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            trim_north: 104,
            trim_south: 105,
            negate_channels: vec![0],
            block_h: 32,
            block_w: 32,
            chunk_len: 1,
            zero_variance: ZeroVariancePolicy::Unit,
            store: GridProcessorConfig::uncompressed(),
            prefetch: 2,
        }
    }
}

fn all_months() -> Vec<u32> {
    (1..=12).collect()
}

fn default_workers() -> usize {
    4
}

impl PreprocessorConfig {
    /// Read, expand and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config {:?}", path))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let expanded = shellexpand::env(content)
            .map_err(|e| anyhow::anyhow!("Environment substitution failed: {}", e))?;
        let config: Self =
            serde_yaml::from_str(&expanded).context("Failed to parse config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Restrict the run to one year and/or month.
    pub fn narrow(&mut self, year: Option<i32>, month: Option<u32>) -> Result<()> {
        if let Some(year) = year {
            self.years = vec![year];
        }
        if let Some(month) = month {
            self.months = vec![month];
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.years.is_empty() {
            bail!("years must not be empty");
        }
        if self.months.is_empty() {
            bail!("months must not be empty");
        }
        if let Some(m) = self.months.iter().find(|m| !(1..=12).contains(*m)) {
            bail!("invalid month {}", m);
        }
        let mut sorted = self.months.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted != self.months {
            bail!("months must be strictly increasing, got {:?}", self.months);
        }
        if self.workers == 0 {
            bail!("workers must be at least 1");
        }

        let d = &self.dataset;
        let rows = self
            .grid
            .n_lat
            .checked_sub(d.trim_north + d.trim_south)
            .filter(|&r| r > 0)
            .with_context(|| {
                format!(
                    "trimming {} + {} rows leaves nothing of {}",
                    d.trim_north, d.trim_south, self.grid.n_lat
                )
            })?;
        if rows % 2 != 0 {
            bail!("{} latitude rows after trimming cannot be split in half", rows);
        }
        if d.block_h == 0 || d.block_w == 0 {
            bail!("block size must be non-zero");
        }
        if (rows / 2) % d.block_h != 0 || self.grid.n_lon % d.block_w != 0 {
            bail!(
                "hemisphere {}x{} is not divisible into {}x{} blocks",
                rows / 2,
                self.grid.n_lon,
                d.block_h,
                d.block_w
            );
        }
        if d.chunk_len == 0 {
            bail!("chunk_len must be at least 1");
        }
        if d.prefetch == 0 {
            bail!("prefetch must be at least 1");
        }
        if let Some(c) = d.negate_channels.iter().find(|&&c| c >= reanalysis::CHANNELS) {
            bail!("negated channel {} out of range", c);
        }
        if self.targets.postprocess.drop_pole_row {
            bail!("targets with the pole row dropped cannot be trimmed like the inputs");
        }
        d.store.validate().map_err(|e| anyhow::anyhow!(e))?;
        self.targets.kernel.validate()?;
        Ok(())
    }

    /// Latitude rows per hemisphere after trimming.
    pub fn hemisphere_rows(&self) -> usize {
        (self.grid.n_lat - self.dataset.trim_north - self.dataset.trim_south) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "
years: [2010]
tracks:
  key: raw/ibtracs.csv
";

    #[test]
    fn test_defaults() {
        let config = PreprocessorConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.months, (1..=12).collect::<Vec<_>>());
        assert_eq!(config.grid.n_lat, 721);
        assert_eq!(config.hemisphere_rows(), 256);
        assert_eq!(config.dataset.negate_channels, vec![0]);
        assert_eq!(config.targets.format, MapFormat::Npz);
        assert_eq!(config.prefixes.inputs, "inputs");
        assert_eq!(
            config.tracks.filter.exclude_track_types,
            vec!["PROVISIONAL_spur".to_string()]
        );
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("PREPROCESSOR_TEST_BUCKET", "cyclone-tracking");
        let yaml = "
storage:
  backend: gcs
  bucket: ${PREPROCESSOR_TEST_BUCKET}
years: [2010]
months: [8, 9, 10]
tracks:
  key: raw/ibtracs.csv
  filter:
    selection:
      by: status
      value: [HU]
targets:
  kernel:
    type: pixel
  format: npy
";
        let config = PreprocessorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.storage.describe(), "gs://cyclone-tracking");
        assert_eq!(config.months, vec![8, 9, 10]);
        assert_eq!(config.targets.kernel, Kernel::Pixel);
        assert_eq!(config.targets.format.extension(), "npy");
        assert!(config.tracks.filter.accepts("main", "TS", "HU"));
        assert!(!config.tracks.filter.accepts("main", "TS", "TS"));
    }

    #[test]
    fn test_missing_variable_rejected() {
        let yaml = "years: [2010]\ntracks:\n  key: ${PREPROCESSOR_TEST_UNSET_VARIABLE}\n";
        assert!(PreprocessorConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = PreprocessorConfig::from_yaml(MINIMAL).unwrap();

        config.months = vec![9, 8];
        assert!(config.validate().is_err());
        config.months = vec![13];
        assert!(config.validate().is_err());
        config.months = vec![8];

        config.dataset.trim_south = 104;
        assert!(config.validate().is_err(), "odd row count");
        config.dataset.trim_south = 105;

        config.dataset.block_w = 7;
        assert!(config.validate().is_err());
        config.dataset.block_w = 32;

        config.dataset.negate_channels = vec![3];
        assert!(config.validate().is_err());
        config.dataset.negate_channels = vec![0];

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_narrow() {
        let mut config = PreprocessorConfig::from_yaml(MINIMAL).unwrap();
        config.narrow(Some(1999), Some(12)).unwrap();
        assert_eq!(config.years, vec![1999]);
        assert_eq!(config.months, vec![12]);
        assert!(config.narrow(None, Some(0)).is_err());
    }
}
