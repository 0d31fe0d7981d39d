//! Blob I/O: fetch facecam/CSV inputs, upload finished artifacts, best-effort CDN
//! purge (§4.B).

pub mod client;
pub mod csv;
pub mod error;

pub use client::{Artifact, BlobStore, BlobStoreConfig};
pub use csv::LeadCsv;
pub use error::{StorageError, StorageResult};

/// Facecams over this size are rejected before download (§4.B).
pub const FACECAM_MAX_BYTES: u64 = 100 * 1024 * 1024;
/// CSVs over this size are rejected before download (§4.B).
pub const CSV_MAX_BYTES: u64 = 5 * 1024 * 1024;
