//! Result-key derivation shared by storage backends and the artifact writer.
//!
//! Key format: `owners/{ownerId}/results/{stem}.png`. `stem` is the project
//! id when known, the original file name's stem otherwise.

/// Derive the deterministic artifact key for an owner's processed result.
pub fn result_key(owner_id: &str, stem: &str) -> String {
    format!("owners/{}/results/{}.png", owner_id, stem)
}
