// Trait seams for the external collaborators: the tokenizer and the text
// generation model. The chat core only ever talks to these interfaces; weight
// loading, the forward pass, and sampling internals live behind them.

use rand::rngs::StdRng;

use crate::error::ChatError;

/// Token id as produced by a Gemma-style vocabulary.
pub type TokenId = i32;

/// Beginning-of-sequence token id in the Gemma vocabulary.
pub const BOS_TOKEN: TokenId = 2;

/// End-of-sequence token id in the Gemma vocabulary.
pub const EOS_TOKEN: TokenId = 1;

/// Seed used whenever deterministic generation is requested.
pub const FIXED_SEED: u64 = 42;

/// Whether the model was trained as a base model or instruction-tuned.
///
/// Instruction-tuned models need turn-delimiter control tokens in their
/// prompts; base models take raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingMode {
    Base,
    InstructionTuned,
}

/// Text-to-token and token-to-text conversion.
pub trait Tokenizer {
    /// Encode text into a token sequence.
    fn encode(&self, text: &str) -> Result<Vec<TokenId>, ChatError>;

    /// Decode a token sequence back into text.
    fn decode(&self, tokens: &[TokenId]) -> Result<String, ChatError>;
}

/// Per-token callback contract for streamed generation.
///
/// The generation capability invokes `on_token` once per token — prompt
/// tokens included — strictly in generation order, on the same call stack as
/// the `generate` call. Return `Ok(true)` to continue, `Ok(false)` to request
/// an early stop. Errors abort generation.
pub trait TokenSink {
    fn on_token(&mut self, token: TokenId, score: f32) -> Result<bool, ChatError>;
}

/// The external generation capability.
///
/// `generate` is synchronous from the caller's point of view; any internal
/// worker-pool parallelism is the implementation's concern. `start_pos` is
/// the absolute token position the prompt begins at, so a multi-turn caller
/// can keep extending one conversation.
pub trait TextModel {
    fn training_mode(&self) -> TrainingMode;

    fn generate(
        &self,
        prompt: &[TokenId],
        start_pos: usize,
        rng: &mut StdRng,
        sink: &mut dyn TokenSink,
    ) -> Result<(), ChatError>;
}
