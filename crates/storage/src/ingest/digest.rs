use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Compares a client supplied digest with a computed one, ignoring hex case and surrounding whitespace.
pub fn hashes_match(claimed: &str, computed: &str) -> bool {
    claimed.trim().eq_ignore_ascii_case(computed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_of_known_input() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn digest_comparison_ignores_case() {
        let computed = sha256_hex(b"abc");
        assert!(hashes_match(&computed.to_uppercase(), &computed));
        assert!(!hashes_match(&sha256_hex(b"abd"), &computed));
    }
}
