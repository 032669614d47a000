use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("failed to fetch key from {uri}: {source}")]
    KeyFetch {
        uri: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("key server at {uri} returned status {status}")]
    KeyStatus { uri: String, status: u16 },
    #[error("failed to initialize AES-128-CBC decryptor")]
    InvalidKeyOrIv,
    #[error("PKCS7 unpad failed, segment is likely mis-keyed")]
    UnpadFailed,
    #[error("unsupported encryption method, cannot decrypt")]
    UnsupportedMethod,
}
