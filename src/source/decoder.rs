//! The decode primitive behind every source load

use std::fs;
use std::path::Path;

use image::DynamicImage;

use crate::data::{AssetKey, CancellationToken};
use crate::error::DecodeError;

/// Turns the raw bytes behind an asset key into a bitmap.
///
/// Production code reads files through [`FileDecoder`]; tests inject
/// their own implementation to control timing and failures.
///
/// Implementations should poll `token` between expensive steps and
/// return [`DecodeError::Cancelled`] once it has fired.
pub trait ImageDecoder: Send + Sync {
    fn decode(
        &self,
        key: &AssetKey,
        token: &CancellationToken,
    ) -> Result<DynamicImage, DecodeError>;
}

/// Decoder that treats the asset key as a filesystem path and decodes
/// it with the `image` crate.
#[derive(Debug, Default)]
pub struct FileDecoder;

impl ImageDecoder for FileDecoder {
    fn decode(
        &self,
        key: &AssetKey,
        token: &CancellationToken,
    ) -> Result<DynamicImage, DecodeError> {
        if token.is_cancelled() {
            return Err(DecodeError::Cancelled);
        }

        let bytes = fs::read(Path::new(key.as_str())).map_err(|source| DecodeError::Open {
            key: key.clone(),
            source,
        })?;

        // Safe point between reading and the CPU-heavy decode
        if token.is_cancelled() {
            return Err(DecodeError::Cancelled);
        }

        let bitmap =
            image::load_from_memory(&bytes).map_err(|source| DecodeError::Malformed {
                key: key.clone(),
                source,
            })?;

        if token.is_cancelled() {
            return Err(DecodeError::Cancelled);
        }

        Ok(bitmap)
    }
}
