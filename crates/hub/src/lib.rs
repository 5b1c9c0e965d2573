//! Session hub: the serialized control loop that owns recording state,
//! focus, and knowledge, wires audio capture through batching and
//! transcription dispatch, runs the insight and suggested-question
//! tickers, and fans transcripts and derived messages out to subscribers.

mod audio_pump;
mod control;
mod outbox;
mod subscriber;
mod ticker;
mod view;

pub use control::{HubConfig, SessionHub};
pub use outbox::{PushOutcome, SubscriberOutbox, DEFAULT_SUBSCRIBER_BUFFER};
pub use subscriber::{SubscriberId, SubscriberRegistry};
pub use view::{SharedView, ViewState};
