use thiserror::Error;

/// Errors produced while parsing or rewriting MPEG-TS structures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TsError {
    #[error("invalid packet size: expected 188 bytes, got {0}")]
    InvalidPacketSize(usize),

    #[error("invalid sync byte: expected 0x47, got {0:#04x}")]
    InvalidSyncByte(u8),

    #[error("insufficient data: expected at least {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("invalid PES start code")]
    InvalidPesStartCode,

    #[error("invalid pts_dts_flags value: {0:#04b}")]
    InvalidPtsDtsFlags(u8),

    #[error("adaptation field would overflow the 188-byte packet")]
    AdaptationFieldOverflow,

    #[error("packet has no PES header to rewrite")]
    NoPesHeader,

    #[error("external probe failed: {0}")]
    ProbeFailed(String),

    #[error("probe output could not be parsed: {0}")]
    ProbeParse(String),
}
