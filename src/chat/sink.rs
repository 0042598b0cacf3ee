// Conversation position state and the two token stream sinks.

use std::io::Write;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::SessionConfig;
use crate::error::ChatError;
use crate::model::{TokenId, TokenSink, Tokenizer, EOS_TOKEN, FIXED_SEED};

/// Token position accounting for one conversation.
///
/// `abs_pos` counts tokens across all turns, `turn_pos` within the current
/// turn only (prompt plus generated), `prompt_len` is the token length of
/// the current turn's formatted prompt.
#[derive(Debug, Default)]
pub struct PositionState {
    pub abs_pos: usize,
    pub turn_pos: usize,
    pub prompt_len: usize,
    /// Set when an end-of-sequence in deterministic non-multiturn mode asks
    /// for the rng to go back to the fixed seed. Applied by the session at
    /// the end of the generation call — the same boundary, since generation
    /// stops at the end-of-sequence token.
    pub(crate) pending_reseed: bool,
}

impl PositionState {
    /// Start a new turn: the turn position resets, the absolute position
    /// carries over.
    pub fn begin_turn(&mut self, prompt_len: usize) {
        self.turn_pos = 0;
        self.prompt_len = prompt_len;
    }

    /// End-of-sequence handling. Outside multiturn mode the conversation is
    /// over: the absolute position resets, and deterministic mode requests a
    /// reseed so the next conversation replays from the fixed seed.
    pub fn end_of_sequence(&mut self, multiturn: bool, deterministic: bool) {
        if !multiturn {
            self.abs_pos = 0;
            if deterministic {
                self.pending_reseed = true;
            }
        }
    }
}

/// Mutable state owned by one generation session.
///
/// The positions and the rng live side by side so a sink can borrow the
/// positions while the same rng is lent to the generation call.
#[derive(Debug)]
pub struct ConversationState {
    pub positions: PositionState,
    pub rng: StdRng,
}

impl ConversationState {
    /// Seed the rng once at session creation: the fixed seed in
    /// deterministic mode, OS entropy otherwise.
    pub fn new(deterministic: bool) -> Self {
        let rng = if deterministic {
            StdRng::seed_from_u64(FIXED_SEED)
        } else {
            StdRng::from_os_rng()
        };
        Self {
            positions: PositionState::default(),
            rng,
        }
    }

    /// Apply a reseed requested by the sink during the last generation call.
    pub fn apply_pending_reseed(&mut self) {
        if self.positions.pending_reseed {
            self.positions.pending_reseed = false;
            self.rng = StdRng::seed_from_u64(FIXED_SEED);
        }
    }
}

/// Streaming sink for interactive sessions.
///
/// Emits a progress dot on the diagnostic channel for each prompt token
/// still being consumed, then decodes and flushes every generated token to
/// the output channel as it arrives.
pub struct InteractiveSink<'a> {
    positions: &'a mut PositionState,
    tokenizer: &'a dyn Tokenizer,
    config: &'a SessionConfig,
    output: &'a mut dyn Write,
    diag: &'a mut dyn Write,
}

impl<'a> InteractiveSink<'a> {
    pub fn new(
        positions: &'a mut PositionState,
        tokenizer: &'a dyn Tokenizer,
        config: &'a SessionConfig,
        output: &'a mut dyn Write,
        diag: &'a mut dyn Write,
    ) -> Self {
        Self {
            positions,
            tokenizer,
            config,
            output,
            diag,
        }
    }
}

impl TokenSink for InteractiveSink<'_> {
    fn on_token(&mut self, token: TokenId, _score: f32) -> Result<bool, ChatError> {
        self.positions.abs_pos += 1;
        self.positions.turn_pos += 1;

        if self.positions.turn_pos < self.positions.prompt_len {
            // Still consuming the prompt.
            write!(self.diag, ".")?;
            self.diag.flush()?;
        } else if token == EOS_TOKEN {
            self.positions
                .end_of_sequence(self.config.multiturn, self.config.deterministic);
            if self.config.verbosity >= 2 {
                writeln!(self.output, "\n[ End ]")?;
                self.output.flush()?;
            }
        } else {
            let text = self.tokenizer.decode(&[token])?;
            if self.positions.turn_pos == self.positions.prompt_len + 1 {
                // First token of the response: models tend to lead with a
                // stray space after the turn marker.
                let text = text.trim_start_matches([' ', '\t', '\n']);
                if self.config.verbosity >= 1 {
                    write!(self.output, "\n\n")?;
                }
                write!(self.output, "{text}")?;
            } else {
                write!(self.output, "{text}")?;
            }
            self.output.flush()?;
        }
        Ok(true)
    }
}

/// Accumulate-only sink for one-shot completion: buffers every token id and
/// leaves decoding to a single batch pass afterwards.
#[derive(Debug, Default)]
pub struct AccumulatingSink {
    tokens: Vec<TokenId>,
}

impl AccumulatingSink {
    pub fn tokens(&self) -> &[TokenId] {
        &self.tokens
    }
}

impl TokenSink for AccumulatingSink {
    fn on_token(&mut self, token: TokenId, _score: f32) -> Result<bool, ChatError> {
        self.tokens.push(token);
        Ok(true)
    }
}
