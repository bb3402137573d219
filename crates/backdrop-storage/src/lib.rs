//! Object storage for uploads and processed artifacts
//!
//! Uploads and result artifacts live in an external object store; this crate
//! defines the trait the pipeline works against, the result-key convention,
//! and two backends: local filesystem and in-memory.
//!
//! **Key format:** uploads arrive at `owners/{ownerId}/uploads/{fileName}`;
//! results are written to `owners/{ownerId}/results/{stem}.png` (see
//! [`keys::result_key`]).

pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
pub mod traits;

#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use traits::{ObjectStorage, StorageError, StorageResult};
