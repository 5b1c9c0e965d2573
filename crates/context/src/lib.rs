//! Context manager: aggregates the running transcript into AI prompts and
//! exposes three derived operations — Q&A, insight generation, and
//! rotating suggested questions — each a pure function of the transcript
//! snapshot, session focus, and knowledge items passed in by the caller.

mod client;
mod limits;
mod manager;
mod parser;
mod questions;

pub use client::{AiError, GenerativeAiClient, HttpGenerativeAiClient};
pub use limits::{assemble_knowledge_block, truncate_front_to_budget, DEFAULT_KNOWLEDGE_BYTE_BUDGET};
pub use manager::{Answer, ContextManager, ContextManagerConfig};
pub use questions::{QuestionRotation, SUMMARIZE_RECENT_DISCUSSION};
