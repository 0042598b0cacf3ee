//! Session management for Gemma-style text generation models.
//!
//! This crate is the layer between a user (interactive or single-shot) and a
//! text generation model: it frames raw text into a token stream, drives
//! generation turn by turn, tracks position state across an unbounded
//! conversation, and renders streamed tokens back into text incrementally.
//!
//! The model and tokenizer themselves are external collaborators, consumed
//! through the narrow traits in [`model`]. Two operations make up the
//! binding surface: [`run_interactive_session`] and
//! [`run_one_shot_completion`].

use std::io;

pub mod chat;
pub mod config;
pub mod error;
pub mod model;

pub use chat::{ChatSession, ConversationState, PositionState};
pub use config::SessionConfig;
pub use error::ChatError;
pub use model::{TextModel, TokenId, TokenSink, Tokenizer, TrainingMode};

/// Run an interactive multi-turn session over stdin/stdout/stderr until
/// end-of-input, a quit sentinel (`%q` / `%Q`), or the token budget is
/// exhausted.
pub fn run_interactive_session<M: TextModel, T: Tokenizer>(
    model: &M,
    tokenizer: &T,
    config: SessionConfig,
) -> Result<(), ChatError> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut session = ChatSession::new(model, tokenizer, config);
    session.run(stdin.lock(), stdout.lock(), stderr.lock())
}

/// Generate a completion for `prompt_text` in a single non-interactive turn
/// and return only the generated continuation.
pub fn run_one_shot_completion<M: TextModel, T: Tokenizer>(
    model: &M,
    tokenizer: &T,
    config: &SessionConfig,
    prompt_text: &str,
) -> Result<String, ChatError> {
    chat::completion::complete(model, tokenizer, config, prompt_text)
}
