//! Deterministic local raster processing
//!
//! The high-fidelity path: cut the product out of its background and flatten
//! it onto a solid studio backdrop. No network, no randomness — identical
//! input bytes and backdrop color always produce identical output bytes.

pub mod processor;
pub mod segmentation;

pub use processor::{BackdropColor, HighFidelityProcessor, ProcessingError};
