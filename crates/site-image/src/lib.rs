//! Image ingestion pipeline
//!
//! Turns an uploaded file into an [`EncodedImage`] small enough to live inside
//! a document field:
//!
//! ```text
//! bytes → decode → downscale to preset (never upscale) → JPEG q70 → base64 data URL → budget check
//! ```
//!
//! Decoding and encoding run on the blocking pool. A decode failure and an
//! over-budget result are distinct errors, and neither produces a value, so no
//! write can follow a failed ingestion.
//!
//! [`ImageIngestor`] adds a bounded, content-addressed cache in front of the
//! codec so repeated uploads of the same file are not re-encoded.
//!
//! [`EncodedImage`]: site_model::EncodedImage

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod codec;
pub mod error;
pub mod preset;

pub use cache::{CacheStats, ImageIngestor, IngestCache};
pub use codec::{decode_encoded, ImageCodec, DEFAULT_JPEG_QUALITY, MAX_ENCODED_BYTES};
pub use error::{ImageError, ImageResult};
pub use preset::SizePreset;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
