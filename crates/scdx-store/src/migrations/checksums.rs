//! Migration checksums
//!
//! An applied migration whose embedded SQL no longer hashes to the recorded
//! value means the binary and the database disagree about the schema.

use sha2::{Digest, Sha256};

/// SHA-256 of the migration SQL, hex encoded
pub fn compute_checksum(sql: &str) -> String {
    hex::encode(Sha256::digest(sql.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_sha256_hex() {
        let checksum = compute_checksum("SELECT 1");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, compute_checksum("SELECT 1"));
        assert_ne!(checksum, compute_checksum("SELECT 2"));
    }
}
