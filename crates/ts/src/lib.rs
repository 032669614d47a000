//! Transport Stream (TS) codec for MPEG-2 Transport Stream data.
//!
//! Covers both directions needed by a recording pipeline: parsing sync
//! bytes, PIDs, adaptation fields and PES headers, and rewriting PTS/DTS/PCR,
//! continuity counters and the discontinuity indicator so that concatenated
//! segments play back as one continuous stream.

pub mod adaptation_field;
pub mod codec;
pub mod error;
pub mod packet;
pub mod pes;
pub mod probe;

pub use adaptation_field::{AdaptationField, AdaptationFieldRef, Pcr};
pub use codec::{
    is_valid_ts, read_dts, read_pcr, read_pts, set_discontinuity_indicator, shift_segment,
    update_continuity_counters, write_dts, write_pcr, write_pts,
};
pub use error::TsError;
pub use packet::{ContinuityMode, ContinuityStatus, PID_CAT, PID_NULL, PID_PAT, TsPacket};
pub use pes::{PesHeader, PesHeaderRef};
pub use probe::{ProbeResult, probe};

/// Result type for TS parsing and rewriting operations.
pub type Result<T> = std::result::Result<T, TsError>;
