//! Transcription dispatch: retry with backoff, primary/fallback model
//! chain, and a reorder buffer that restores strict `batch_seq` ordering
//! under concurrent dispatch.

mod client;
mod dispatch;
mod error;
mod run;
mod stats;

pub use client::{HttpTranscriptionClient, TranscriptionClient, TranscriptionResult};
pub use dispatch::{dispatch_one, DispatcherConfig};
pub use error::DispatchError;
pub use run::run;
pub use stats::DispatcherStats;
