//! Per-segment encryption info as carried from an `#EXT-X-KEY` tag.

/// The encryption method named on an `#EXT-X-KEY` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionMethod {
    None,
    Aes128,
    /// Anything else (`SAMPLE-AES`, `SAMPLE-AES-CTR`, ...) — not decryptable
    /// by this pipeline, but tracked so the caller can report it.
    Unsupported,
}

/// Encryption attributes attached to a segment, carried forward from the
/// last `#EXT-X-KEY` tag seen in playlist order until superseded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionInfo {
    pub method: EncryptionMethod,
    pub key_uri: Option<String>,
    /// Explicit IV bytes from the `IV` attribute, when present. Absent means
    /// the IV must be derived from the media sequence number.
    pub iv: Option<[u8; 16]>,
}

impl EncryptionInfo {
    pub const fn none() -> Self {
        Self {
            method: EncryptionMethod::None,
            key_uri: None,
            iv: None,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        !matches!(self.method, EncryptionMethod::None)
    }
}

impl Default for EncryptionInfo {
    fn default() -> Self {
        Self::none()
    }
}
