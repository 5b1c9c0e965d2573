//! VAD-adaptive batcher: converts an unbounded PCM stream into
//! transcription-ready [`Utterance`]s under dual duration and silence
//! boundary policies.

mod config;
mod runner;
mod state_machine;
mod utterance;

pub use config::BatcherConfig;
pub use runner::{run_blocking, BatcherCommand};
pub use state_machine::Batcher;
pub use utterance::Utterance;
