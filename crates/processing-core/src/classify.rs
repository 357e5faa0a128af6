//! Payload classification.

/// ZIP local-file-header signature (`PK\x03\x04`).
pub const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// What a downloaded payload turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// A finished asset, persisted verbatim.
    Asset,
    /// A ZIP bundle holding a base stream and possibly an overlay.
    Archive,
}

impl PayloadKind {
    pub fn of(bytes: &[u8]) -> Self {
        if is_archive(bytes) {
            Self::Archive
        } else {
            Self::Asset
        }
    }
}

/// True iff the payload is longer than the signature and starts with it.
pub fn is_archive(bytes: &[u8]) -> bool {
    bytes.len() > ZIP_SIGNATURE.len() && bytes.starts_with(&ZIP_SIGNATURE)
}
