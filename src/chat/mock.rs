// Scripted model and tokenizer for exercising the session machinery without
// real weights. Compiled for tests, or for hosts that opt into the `mock`
// feature.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::Rng;

use crate::error::ChatError;
use crate::model::{TextModel, TokenId, TokenSink, Tokenizer, TrainingMode, EOS_TOKEN};

/// Text token ids start here; everything below is treated as a control token
/// that decodes to nothing, like sentencepiece control pieces.
const TOKEN_BASE: TokenId = 1000;

/// Token id for a single text byte.
pub fn token_for_byte(byte: u8) -> TokenId {
    TokenId::from(byte) + TOKEN_BASE
}

/// Byte-level tokenizer: one token per byte, losslessly reversible, control
/// tokens decode to the empty string.
pub struct MockTokenizer;

impl Tokenizer for MockTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>, ChatError> {
        Ok(text.bytes().map(token_for_byte).collect())
    }

    fn decode(&self, tokens: &[TokenId]) -> Result<String, ChatError> {
        let bytes: Vec<u8> = tokens
            .iter()
            .filter(|&&token| token >= TOKEN_BASE)
            .map(|&token| {
                u8::try_from(token - TOKEN_BASE)
                    .map_err(|_| ChatError::Decoding(format!("token {token} out of range")))
            })
            .collect::<Result<_, _>>()?;
        String::from_utf8(bytes).map_err(|e| ChatError::Decoding(e.to_string()))
    }
}

/// Scripted generation capability.
///
/// Streams the prompt tokens back through the sink first (the generation
/// capability invokes the sink for prompt tokens too), then the next scripted
/// reply, then optionally an rng-derived tail byte, then end-of-sequence.
pub struct MockModel {
    mode: TrainingMode,
    replies: Mutex<VecDeque<Vec<TokenId>>>,
    rng_tail: bool,
    emit_eos: bool,
    calls: AtomicUsize,
    rng_tails: Mutex<Vec<u8>>,
}

impl MockModel {
    pub fn new(mode: TrainingMode) -> Self {
        Self {
            mode,
            replies: Mutex::new(VecDeque::new()),
            rng_tail: false,
            emit_eos: true,
            calls: AtomicUsize::new(0),
            rng_tails: Mutex::new(Vec::new()),
        }
    }

    /// Queue a reply; replies are consumed one per generation call.
    pub fn with_reply(self, text: &str) -> Self {
        let tokens = MockTokenizer
            .encode(text)
            .expect("mock tokenizer encode is infallible");
        self.replies.lock().unwrap().push_back(tokens);
        self
    }

    /// Append one rng-derived letter to each reply, so output depends on the
    /// session's seeding policy.
    pub fn with_rng_tail(mut self) -> Self {
        self.rng_tail = true;
        self
    }

    /// Skip the end-of-sequence token, leaving the turn budget-bounded.
    pub fn without_eos(mut self) -> Self {
        self.emit_eos = false;
        self
    }

    /// Number of generation calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The rng-derived tail bytes drawn so far, one per generation call.
    pub fn rng_tails(&self) -> Vec<u8> {
        self.rng_tails.lock().unwrap().clone()
    }
}

impl TextModel for MockModel {
    fn training_mode(&self) -> TrainingMode {
        self.mode
    }

    fn generate(
        &self,
        prompt: &[TokenId],
        _start_pos: usize,
        rng: &mut StdRng,
        sink: &mut dyn TokenSink,
    ) -> Result<(), ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        for &token in prompt {
            if !sink.on_token(token, 0.0)? {
                return Ok(());
            }
        }

        let reply = self.replies.lock().unwrap().pop_front().unwrap_or_default();
        for &token in &reply {
            if !sink.on_token(token, 0.0)? {
                return Ok(());
            }
        }

        if self.rng_tail {
            let byte = b'a' + rng.random_range(0..26u8);
            self.rng_tails.lock().unwrap().push(byte);
            if !sink.on_token(token_for_byte(byte), 0.0)? {
                return Ok(());
            }
        }

        if self.emit_eos {
            sink.on_token(EOS_TOKEN, 0.0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_tokenizer_round_trips_text() {
        let tokenizer = MockTokenizer;
        let tokens = tokenizer.encode("hello world").unwrap();
        assert_eq!(tokenizer.decode(&tokens).unwrap(), "hello world");
    }

    #[test]
    fn test_control_tokens_decode_to_nothing() {
        let tokenizer = MockTokenizer;
        let mut tokens = vec![crate::model::BOS_TOKEN];
        tokens.extend(tokenizer.encode("hi").unwrap());
        tokens.push(EOS_TOKEN);
        assert_eq!(tokenizer.decode(&tokens).unwrap(), "hi");
    }
}
