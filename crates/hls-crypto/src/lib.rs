//! Key fetching and AES-128-CBC decryption for HLS segments.

pub mod error;

use std::time::Duration;

use aes::Aes128;
use bytes::Bytes;
use cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};
use hls_model::key::{EncryptionInfo, EncryptionMethod};

pub use error::CryptoError;

type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Fetches AES-128 keys referenced by `#EXT-X-KEY` URIs.
pub struct KeyFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl KeyFetcher {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Fetches a key. The HLS spec mandates 16-byte AES-128 keys; a response
    /// of a different length is still accepted (with a warning) since some
    /// CDNs have been observed padding or truncating incorrectly.
    pub async fn fetch_key(&self, key_uri: &str) -> Result<[u8; 16], CryptoError> {
        let response = self
            .client
            .get(key_uri)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| CryptoError::KeyFetch {
                uri: key_uri.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CryptoError::KeyStatus {
                uri: key_uri.to_string(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|source| CryptoError::KeyFetch {
            uri: key_uri.to_string(),
            source,
        })?;

        let mut key = [0u8; 16];
        if bytes.len() != 16 {
            tracing::warn!(
                uri = key_uri,
                len = bytes.len(),
                "AES-128 key response was not 16 bytes, using as-is"
            );
        }
        let take = bytes.len().min(16);
        key[..take].copy_from_slice(&bytes[..take]);
        Ok(key)
    }
}

/// Derives the 16-byte IV from a media sequence number when the playlist
/// didn't carry an explicit `IV` attribute: the big-endian sequence number,
/// right-aligned into a zeroed 16-byte buffer.
pub fn derive_iv(sequence: u64) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[8..].copy_from_slice(&sequence.to_be_bytes());
    iv
}

/// Decrypts a segment given its encryption info and the sequence number to
/// derive an IV from when the playlist didn't supply one explicitly.
/// Returns `Ok(None)` (never an error) when the method is absent/NONE —
/// callers should treat that as "use `data` unchanged" — and returns
/// `Err` only for genuine decrypt failures.
pub fn decrypt(
    data: Bytes,
    key: &[u8; 16],
    info: &EncryptionInfo,
    sequence: u64,
) -> Result<Bytes, CryptoError> {
    if !matches!(info.method, EncryptionMethod::Aes128) {
        return Err(CryptoError::UnsupportedMethod);
    }
    let iv = info.iv.unwrap_or_else(|| derive_iv(sequence));

    let mut buffer = data.to_vec();
    let cipher =
        Aes128CbcDec::new_from_slices(key, &iv).map_err(|_| CryptoError::InvalidKeyOrIv)?;
    let decrypted_len = cipher
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|_| CryptoError::UnpadFailed)?
        .len();
    buffer.truncate(decrypted_len);
    Ok(Bytes::from(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes::Aes128;
    use cipher::BlockEncryptMut;

    type Aes128CbcEnc = cbc::Encryptor<Aes128>;

    fn encrypt(plaintext: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Vec<u8> {
        let cipher = Aes128CbcEnc::new_from_slices(key, iv).unwrap();
        cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    #[test]
    fn decrypt_roundtrips_explicit_iv() {
        let key = [0x42u8; 16];
        let iv = [0x24u8; 16];
        let plaintext = b"hello mpeg-ts world, this is a segment payload";
        let ciphertext = encrypt(plaintext, &key, &iv);

        let info = EncryptionInfo {
            method: EncryptionMethod::Aes128,
            key_uri: Some("k.key".into()),
            iv: Some(iv),
        };
        let out = decrypt(Bytes::from(ciphertext), &key, &info, 7).unwrap();
        assert_eq!(out.as_ref(), plaintext);
    }

    #[test]
    fn decrypt_derives_iv_from_sequence_when_absent() {
        let key = [0x11u8; 16];
        let sequence = 42u64;
        let iv = derive_iv(sequence);
        let plaintext = b"derived iv segment payload bytes";
        let ciphertext = encrypt(plaintext, &key, &iv);

        let info = EncryptionInfo {
            method: EncryptionMethod::Aes128,
            key_uri: Some("k.key".into()),
            iv: None,
        };
        let out = decrypt(Bytes::from(ciphertext), &key, &info, sequence).unwrap();
        assert_eq!(out.as_ref(), plaintext);
    }

    #[test]
    fn decrypt_rejects_unsupported_method() {
        let info = EncryptionInfo {
            method: EncryptionMethod::Unsupported,
            key_uri: Some("k.key".into()),
            iv: None,
        };
        let err = decrypt(Bytes::from_static(b"xx"), &[0u8; 16], &info, 0).unwrap_err();
        assert!(matches!(err, CryptoError::UnsupportedMethod));
    }

    #[test]
    fn derive_iv_is_big_endian_right_aligned() {
        let iv = derive_iv(1);
        assert_eq!(&iv[0..8], &[0u8; 8]);
        assert_eq!(&iv[8..16], &1u64.to_be_bytes());
    }
}
