//! Content hash of snapshot inputs.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::ResultsResult;

/// Hex SHA-256 of the JSON encoding of `inputs`.
pub fn input_hash<T: Serialize>(inputs: &T) -> ResultsResult<String> {
    let json = serde_json::to_vec(inputs)?;
    let digest = Sha256::digest(&json);
    Ok(format!("{:x}", digest))
}
