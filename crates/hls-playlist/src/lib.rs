//! HLS playlist fetching (C4) and incremental processing (C5).

pub mod error;
pub mod fetcher;
pub mod processor;

pub use error::PlaylistError;
pub use fetcher::{PlaylistFetcher, directory_differs};
pub use processor::PlaylistProcessor;
