//! Zarr V3 writer for incrementally filled, time-chunked arrays.
//!
//! The store shape is fixed at creation. Slices along axis 0 are then written
//! at contiguous, strictly increasing offsets until the store is full:
//!
//! ```text
//! create(total = [L, ...])
//!   write_slice(0,  a[0..n0])
//!   write_slice(n0, a[0..n1])      offset must equal the running offset
//!   ...
//! finish()                         running offset must equal L
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::{Array, Dimension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::{ArrayBuilder, DataType, Element, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use crate::config::{GridProcessorConfig, ZarrCompression};
use crate::error::{GridProcessorError, Result};

/// Element type of a chunked store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreDtype {
    #[default]
    Float32,
    Float64,
    UInt8,
}

impl StoreDtype {
    fn data_type(&self) -> DataType {
        match self {
            Self::Float32 => DataType::Float32,
            Self::Float64 => DataType::Float64,
            Self::UInt8 => DataType::UInt8,
        }
    }

    /// NaN for floats so unwritten regions stand out; 0 otherwise.
    fn fill_value(&self) -> FillValue {
        match self {
            Self::Float32 => FillValue::from(f32::NAN),
            Self::Float64 => FillValue::from(f64::NAN),
            Self::UInt8 => FillValue::from(0u8),
        }
    }

    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::Float32 => 4,
            Self::Float64 => 8,
            Self::UInt8 => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::UInt8 => "uint8",
        }
    }
}

/// What a finished store contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSummary {
    /// Directory holding the store.
    pub path: PathBuf,
    /// Full array shape.
    pub shape: Vec<u64>,
    /// Chunk shape.
    pub chunk_shape: Vec<u64>,
    /// Number of `write_slice` calls.
    pub slices_written: usize,
    /// Uncompressed bytes written.
    pub bytes_written: u64,
}

/// A Zarr V3 array on the local filesystem, filled along axis 0.
pub struct ChunkedStore {
    path: PathBuf,
    array: zarrs::array::Array<FilesystemStore>,
    shape: Vec<u64>,
    chunk_shape: Vec<u64>,
    dtype: StoreDtype,
    offset: u64,
    slices_written: usize,
    bytes_written: u64,
}

impl std::fmt::Debug for ChunkedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedStore")
            .field("path", &self.path)
            .field("shape", &self.shape)
            .field("chunk_shape", &self.chunk_shape)
            .field("dtype", &self.dtype)
            .field("offset", &self.offset)
            .finish()
    }
}

impl ChunkedStore {
    /// Create a store at `path` (a directory, created if missing) and write
    /// its metadata.
    #[instrument(skip(path, config), fields(path = %path.as_ref().display()))]
    pub fn create(
        path: impl AsRef<Path>,
        total_shape: &[u64],
        chunk_shape: &[u64],
        dtype: StoreDtype,
        config: &GridProcessorConfig,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if total_shape.is_empty() || total_shape.len() != chunk_shape.len() {
            return Err(GridProcessorError::shape_mismatch(total_shape, chunk_shape));
        }
        if chunk_shape.iter().any(|&c| c == 0) {
            return Err(GridProcessorError::ConfigError(format!(
                "chunk shape {:?} has a zero dimension",
                chunk_shape
            )));
        }
        config.validate().map_err(GridProcessorError::ConfigError)?;

        std::fs::create_dir_all(&path)?;
        let store = FilesystemStore::new(&path)
            .map_err(|e| GridProcessorError::StorageError(e.to_string()))?;

        // Build attributes
        let mut attrs = serde_json::Map::new();
        attrs.insert("dtype".to_string(), serde_json::json!(dtype.as_str()));
        attrs.insert(
            "compression".to_string(),
            serde_json::json!(config.zarr_compression.as_str()),
        );
        attrs.insert("complete".to_string(), serde_json::json!(false));

        // Create chunk grid
        let chunk_grid: zarrs::array::ChunkGrid = chunk_shape
            .to_vec()
            .try_into()
            .map_err(|e| GridProcessorError::ConfigError(format!("{:?}", e)))?;

        let mut binding = ArrayBuilder::new(
            total_shape.to_vec(),
            dtype.data_type(),
            chunk_grid,
            dtype.fill_value(),
        );
        let mut builder = binding.attributes(attrs);

        if config.zarr_compression != ZarrCompression::None {
            let codec = create_compression_codec(config, dtype)?;
            builder = builder.bytes_to_bytes_codecs(vec![codec]);
        }

        let array = builder
            .build(Arc::new(store), "/")
            .map_err(|e| GridProcessorError::zarr_error(e.to_string()))?;
        array
            .store_metadata()
            .map_err(|e| GridProcessorError::StorageError(e.to_string()))?;

        info!(
            shape = ?total_shape,
            chunks = ?chunk_shape,
            dtype = dtype.as_str(),
            compression = %config.zarr_compression,
            "Created chunked store"
        );

        Ok(Self {
            path,
            array,
            shape: total_shape.to_vec(),
            chunk_shape: chunk_shape.to_vec(),
            dtype,
            offset: 0,
            slices_written: 0,
            bytes_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Next offset a write must start at.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Length of axis 0.
    pub fn len(&self) -> u64 {
        self.shape[0]
    }

    pub fn is_empty(&self) -> bool {
        self.shape[0] == 0
    }

    /// Write `array` to `[offset, offset + len)` along axis 0.
    pub fn write_slice<T, D>(&mut self, offset: u64, array: &Array<T, D>) -> Result<()>
    where
        T: Element + Clone,
        D: Dimension,
    {
        if offset != self.offset {
            return Err(GridProcessorError::OffsetMismatch {
                expected: self.offset,
                got: offset,
            });
        }

        let shape: Vec<u64> = array.shape().iter().map(|&d| d as u64).collect();
        if shape.len() != self.shape.len() || shape[1..] != self.shape[1..] {
            return Err(GridProcessorError::shape_mismatch(
                [&[0u64][..], &self.shape[1..]].concat(),
                &shape,
            ));
        }

        let len = shape[0];
        let total = self.shape[0];
        if offset + len > total {
            return Err(GridProcessorError::Overflow { offset, len, total });
        }
        if len == 0 {
            return Ok(());
        }

        let mut start = vec![0u64; shape.len()];
        start[0] = offset;
        let subset = ArraySubset::new_with_start_shape(start, shape)
            .map_err(|e| GridProcessorError::StorageError(e.to_string()))?;

        let contiguous = array.as_standard_layout();
        let elements = contiguous.as_slice().ok_or_else(|| {
            GridProcessorError::StorageError("array is not contiguous".to_string())
        })?;

        self.array
            .store_array_subset_elements(&subset, elements)
            .map_err(|e| GridProcessorError::StorageError(e.to_string()))?;

        self.offset += len;
        self.slices_written += 1;
        self.bytes_written += (elements.len() * self.dtype.size()) as u64;

        debug!(
            offset,
            len,
            written = self.offset,
            total,
            "Wrote store slice"
        );
        Ok(())
    }

    /// Write `array` at the running offset.
    pub fn append<T, D>(&mut self, array: &Array<T, D>) -> Result<()>
    where
        T: Element + Clone,
        D: Dimension,
    {
        self.write_slice(self.offset, array)
    }

    /// Check that every slice was written and mark the store complete.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn finish(mut self) -> Result<StoreSummary> {
        let total = self.shape[0];
        if self.offset != total {
            return Err(GridProcessorError::Incomplete {
                written: self.offset,
                total,
            });
        }

        self.array
            .attributes_mut()
            .insert("complete".to_string(), serde_json::json!(true));
        self.array
            .store_metadata()
            .map_err(|e| GridProcessorError::StorageError(e.to_string()))?;

        info!(
            shape = ?self.shape,
            slices = self.slices_written,
            bytes = self.bytes_written,
            "Finished chunked store"
        );

        Ok(StoreSummary {
            path: self.path,
            shape: self.shape,
            chunk_shape: self.chunk_shape,
            slices_written: self.slices_written,
            bytes_written: self.bytes_written,
        })
    }
}

/// Create the compression codec based on configuration.
fn create_compression_codec(
    config: &GridProcessorConfig,
    dtype: StoreDtype,
) -> Result<Arc<dyn zarrs::array::codec::BytesToBytesCodecTraits>> {
    let level = BloscCompressionLevel::try_from(config.zarr_compression_level)
        .map_err(|_| GridProcessorError::ConfigError("Invalid compression level".to_string()))?;

    let shuffle = if config.zarr_shuffle {
        BloscShuffleMode::Shuffle
    } else {
        BloscShuffleMode::NoShuffle
    };

    // typesize is required when shuffle is enabled
    let typesize = if config.zarr_shuffle {
        Some(dtype.size())
    } else {
        None
    };

    let compressor = match config.zarr_compression {
        ZarrCompression::None => {
            return Err(GridProcessorError::ConfigError(
                "No compression configured".to_string(),
            ))
        }
        ZarrCompression::BloscLz4 => BloscCompressor::LZ4,
        ZarrCompression::BloscZstd => BloscCompressor::Zstd,
    };

    // BloscCodec::new(cname, clevel, blocksize, shuffle_mode, typesize)
    let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
        .map_err(|e| GridProcessorError::ConfigError(e.to_string()))?;

    Ok(Arc::new(codec))
}
