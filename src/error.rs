use thiserror::Error;

/// Errors surfaced by the chat core.
///
/// There is no retry logic anywhere in this crate: every failure aborts the
/// current operation and carries enough context in its message to tell which
/// stage produced it. Quit sentinels and end-of-input are normal termination
/// signals, not errors.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The tokenizer rejected input text. Fatal for the turn: a session
    /// cannot proceed without a valid prompt.
    #[error("tokenizer rejected prompt text: {0}")]
    Encoding(String),

    /// The tokenizer could not render generated tokens back to text. Fatal
    /// for both the interactive and one-shot paths, since a partial decode
    /// would corrupt the output stream.
    #[error("failed to decode generated tokens: {0}")]
    Decoding(String),

    /// The external generation capability failed. Propagated as-is.
    #[error("generation failed: {0}")]
    Generation(String),

    /// Writing to the output or diagnostic channel failed.
    #[error("output channel error: {0}")]
    Io(#[from] std::io::Error),
}
