//! Sentence Drill content provider
//!
//! An implementation of [`drill_session::ContentProvider`] that asks a
//! chat-completions model for example batches and practice feedback.
//!
//! Replies are validated before they reach the session: a batch must parse
//! as JSON (optionally wrapped in a Markdown code fence) and hold exactly
//! [`drill_session::BATCH_SIZE`] complete examples.

pub mod client;
pub mod parse;
pub mod prompt;

pub use client::{OpenAiProvider, OpenAiSettings};
pub use parse::{parse_batch, parse_feedback, strip_code_fence};
pub use prompt::{batch_prompt, feedback_prompt, Prompt};
