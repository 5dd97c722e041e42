//! treeprompt: turn a project tree into an LLM prompt, estimate its cost,
//! and send it to a chat-completion API.
//!
//! The pipeline is strictly sequential:
//!
//! 1. [`walk`] collects project files and [`tree`] renders the directory.
//! 2. [`prompt`] merges both into a system and a user message.
//! 3. [`cost`] estimates tokens and dollars before the call.
//! 4. [`gateway`] sends the messages (or answers from a canned dry-run
//!    response) and [`pipeline`] persists and prices the reply.
//!
//! [`driver`] asks the operator for every input interactively.

pub mod config;
pub mod cost;
pub mod driver;
pub mod gateway;
pub mod lang;
pub mod logging;
pub mod message;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod tree;
pub mod walk;
