use sha2::{Digest, Sha256};

/// SHA-256 of a secret truncated to 12 hex chars, prefixed with `sha256:`.
///
/// Lets logs and `Debug` output tell keys apart without printing them.
pub fn key_fingerprint(secret: &str) -> String {
    let hash = Sha256::digest(secret.as_bytes());
    format!("sha256:{}", hex::encode(&hash[..6]))
}

mod hex {
    /// Encode bytes as lowercase hex string.
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}
