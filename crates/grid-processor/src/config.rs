//! Configuration for chunked store writing.

use serde::{Deserialize, Serialize};

/// Configuration for the chunked store writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridProcessorConfig {
    /// Compression codec for Zarr files.
    pub zarr_compression: ZarrCompression,

    /// Compression level (1-9).
    pub zarr_compression_level: u8,

    /// Enable byte shuffle filter for better compression.
    pub zarr_shuffle: bool,
}

impl Default for GridProcessorConfig {
    fn default() -> Self {
        Self {
            zarr_compression: ZarrCompression::BloscZstd,
            zarr_compression_level: 1,
            zarr_shuffle: true,
        }
    }
}

impl GridProcessorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ZARR_COMPRESSION") {
            config.zarr_compression = ZarrCompression::from_str(&val);
        }

        if let Ok(val) = std::env::var("ZARR_COMPRESSION_LEVEL") {
            if let Ok(level) = val.parse() {
                config.zarr_compression_level = level;
            }
        }

        if let Ok(val) = std::env::var("ZARR_SHUFFLE") {
            config.zarr_shuffle = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.zarr_compression != ZarrCompression::None
            && (self.zarr_compression_level == 0 || self.zarr_compression_level > 9)
        {
            return Err("zarr_compression_level must be 1-9".to_string());
        }

        Ok(())
    }

    /// An uncompressed configuration, mostly for tests and inspection.
    pub fn uncompressed() -> Self {
        Self {
            zarr_compression: ZarrCompression::None,
            ..Default::default()
        }
    }
}

/// Compression codec for Zarr files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ZarrCompression {
    /// No compression.
    None,
    /// Blosc with LZ4.
    BloscLz4,
    /// Blosc with Zstd (recommended).
    #[default]
    BloscZstd,
}

impl ZarrCompression {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "none" => Self::None,
            "lz4" | "blosc_lz4" => Self::BloscLz4,
            "zstd" | "blosc_zstd" => Self::BloscZstd,
            _ => Self::BloscZstd,
        }
    }

    /// Get the codec name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BloscLz4 => "blosc_lz4",
            Self::BloscZstd => "blosc_zstd",
        }
    }
}

impl std::fmt::Display for ZarrCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
