//! Known-ceremony digest registry (§4.8, ambient supplement).
//!
//! Lets an operator sanity-check a downloaded Phase 1 file against a short
//! table of known-good digests before contributing to it, mirroring the
//! grounding crate's `srs_setup::KNOWN_CEREMONIES` idiom. Purely advisory: a
//! mismatch is logged and surfaced to the caller, never a hard failure,
//! since an unrecognized file is still validated cryptographically by
//! [`crate::phase1::verify`].

use sha2::{Digest, Sha256};
use std::io::Read;

/// One known-good Phase 1 ceremony transcript.
#[derive(Debug, Clone, Copy)]
pub struct KnownCeremony {
    /// Human-readable ceremony name.
    pub name: &'static str,
    /// `power` the ceremony file was generated at.
    pub power: u8,
    /// SHA-256 digest of the full file contents at the time it was recorded.
    pub digest: [u8; 32],
}

/// Registry of known ceremony digests. Empty until an operator records a
/// verified transcript here.
pub const KNOWN_CEREMONIES: &[KnownCeremony] = &[];

/// Outcome of comparing a file's digest against [`KNOWN_CEREMONIES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestCheck {
    /// Matches a known ceremony by name.
    Known(&'static str),
    /// No entry in the registry matches this digest.
    Unrecognized,
}

/// SHA-256 over the full contents of `reader`, read to EOF.
pub fn digest_of(mut reader: impl Read) -> std::io::Result<[u8; 32]> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 1 << 16];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}

/// Compare `digest` against the registry and log a warning on a mismatch
/// with every known entry (never an error: the caller should proceed to
/// `Phase1Engine::verify` regardless).
pub fn check_digest(digest: [u8; 32]) -> DigestCheck {
    match KNOWN_CEREMONIES.iter().find(|c| c.digest == digest) {
        Some(c) => DigestCheck::Known(c.name),
        None => {
            tracing::warn!(
                digest = %hex::encode(digest),
                "phase1 file digest does not match any known ceremony; proceeding with cryptographic verification only"
            );
            DigestCheck::Unrecognized
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn empty_registry_reports_unrecognized() {
        let digest = digest_of(Cursor::new(b"anything")).unwrap();
        assert_eq!(check_digest(digest), DigestCheck::Unrecognized);
    }

    #[test]
    fn digest_of_is_deterministic() {
        let a = digest_of(Cursor::new(b"same bytes")).unwrap();
        let b = digest_of(Cursor::new(b"same bytes")).unwrap();
        assert_eq!(a, b);
    }
}
