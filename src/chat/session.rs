// The interactive generation session: read a line, format it, stream the
// model's response, account positions, repeat.

use std::io::{BufRead, Write};
use std::time::Instant;

use log::{debug, info};

use crate::chat::sink::{ConversationState, InteractiveSink};
use crate::chat::template::format_prompt;
use crate::config::SessionConfig;
use crate::error::ChatError;
use crate::model::{TextModel, Tokenizer};

/// Case-sensitive quit sentinels, matched against the trimmed input line.
const QUIT_SENTINELS: [&str; 2] = ["%q", "%Q"];

/// One interactive multi-turn session against a model.
///
/// Owns the conversation state for its whole lifetime; the state is dropped
/// with the session. Sessions are single-threaded by design — the only
/// blocking points are the line read and the generation call, and sink
/// callbacks arrive synchronously on the generation call stack.
pub struct ChatSession<'a, M: TextModel, T: Tokenizer> {
    model: &'a M,
    tokenizer: &'a T,
    config: SessionConfig,
    state: ConversationState,
}

impl<'a, M: TextModel, T: Tokenizer> ChatSession<'a, M, T> {
    pub fn new(model: &'a M, tokenizer: &'a T, config: SessionConfig) -> Self {
        let state = ConversationState::new(config.deterministic);
        Self {
            model,
            tokenizer,
            config,
            state,
        }
    }

    /// Conversation state, mainly for inspection after a scripted run.
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Run the session loop until end-of-input, a quit sentinel, or the
    /// token budget is exhausted.
    ///
    /// `input` is the blocking line source; `output` receives the streamed
    /// response text and `diag` the progress indicators. Both channels are
    /// flushed per token so the caller sees output in emission order.
    pub fn run<R, W, D>(&mut self, mut input: R, mut output: W, mut diag: D) -> Result<(), ChatError>
    where
        R: BufRead,
        W: Write,
        D: Write,
    {
        let model = self.model;
        let tokenizer = self.tokenizer;

        while self.state.positions.abs_pos < self.config.max_tokens {
            // AWAITING_INPUT
            if self.config.verbosity >= 1 {
                write!(output, "> ")?;
                output.flush()?;
            }
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                debug!("input stream closed, ending session");
                return Ok(());
            }
            let text = line.trim_end_matches(['\r', '\n']);
            if QUIT_SENTINELS.contains(&text.trim()) {
                debug!("quit sentinel received, ending session");
                return Ok(());
            }

            // FORMATTING
            let abs_pos = self.state.positions.abs_pos;
            let prompt = format_prompt(tokenizer, text, model.training_mode(), abs_pos)?;
            self.state.positions.begin_turn(prompt.len());
            debug!(
                "formatted prompt: {} tokens at absolute position {abs_pos}",
                prompt.len()
            );

            write!(diag, "\n[ Reading prompt ] ")?;
            diag.flush()?;

            // GENERATING
            let turn_start = Instant::now();
            {
                let ConversationState { positions, rng } = &mut self.state;
                let mut sink =
                    InteractiveSink::new(positions, tokenizer, &self.config, &mut output, &mut diag);
                model.generate(&prompt, abs_pos, rng, &mut sink)?;
            }
            self.state.apply_pending_reseed();

            // DRAINING
            let elapsed = turn_start.elapsed().as_secs_f64();
            let turn_tokens = self.state.positions.turn_pos;
            info!(
                "turn complete: {turn_tokens} tokens in {elapsed:.2}s ({} total)",
                self.state.positions.abs_pos
            );
            if self.config.verbosity >= 2 {
                let tok_per_sec = if elapsed > 0.0 {
                    turn_tokens as f64 / elapsed
                } else {
                    0.0
                };
                writeln!(
                    output,
                    "{turn_tokens} tokens ({} total tokens)",
                    self.state.positions.abs_pos
                )?;
                writeln!(output, "{tok_per_sec:.2} tokens / sec")?;
            }
            write!(output, "\n\n")?;
            output.flush()?;
        }

        info!(
            "token budget exhausted at {} tokens",
            self.state.positions.abs_pos
        );
        writeln!(
            output,
            "max_tokens ({}) exceeded. Increase the limit to continue the conversation.",
            self.config.max_tokens
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::mock::{MockModel, MockTokenizer};
    use crate::model::TrainingMode;

    fn run_session(
        model: &MockModel,
        config: SessionConfig,
        input: &str,
    ) -> (ChatSessionResult, String, String) {
        let tokenizer = MockTokenizer;
        let mut session = ChatSession::new(model, &tokenizer, config);
        let mut output = Vec::new();
        let mut diag = Vec::new();
        let result = session.run(input.as_bytes(), &mut output, &mut diag);
        result.unwrap();
        let abs_pos = session.state().positions.abs_pos;
        (
            ChatSessionResult { abs_pos },
            String::from_utf8(output).unwrap(),
            String::from_utf8(diag).unwrap(),
        )
    }

    struct ChatSessionResult {
        abs_pos: usize,
    }

    #[test]
    fn test_quit_sentinel_skips_generation() {
        for sentinel in ["%q\n", "%Q\n", "  %q  \n"] {
            let model = MockModel::new(TrainingMode::Base).with_reply("never");
            let (result, _, _) = run_session(&model, SessionConfig::default(), sentinel);
            assert_eq!(model.calls(), 0, "sentinel {sentinel:?} reached the model");
            assert_eq!(result.abs_pos, 0);
        }
    }

    #[test]
    fn test_end_of_input_terminates() {
        let model = MockModel::new(TrainingMode::Base).with_reply("never");
        run_session(&model, SessionConfig::default(), "");
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn test_multiturn_accumulates_absolute_position() {
        let model = MockModel::new(TrainingMode::Base)
            .with_reply("ok")
            .with_reply("ok");
        let config = SessionConfig {
            multiturn: true,
            ..SessionConfig::default()
        };
        let (result, _, _) = run_session(&model, config, "hi\nbye\n");
        // Turn 1: bos + "hi" (2) prompt tokens, "ok" (2) reply, eos = 6.
        // Turn 2: "bye" (3) prompt tokens (no bos), reply + eos = 6.
        assert_eq!(model.calls(), 2);
        assert_eq!(result.abs_pos, 12);
    }

    #[test]
    fn test_non_multiturn_resets_after_end_of_sequence() {
        let model = MockModel::new(TrainingMode::Base)
            .with_reply("ok")
            .with_reply("ok");
        let (result, _, _) = run_session(&model, SessionConfig::default(), "hi\nbye\n");
        assert_eq!(model.calls(), 2);
        assert_eq!(result.abs_pos, 0);
    }

    #[test]
    fn test_budget_exhaustion_reports_notice() {
        // No end-of-sequence, so the absolute position keeps the generated
        // tokens and trips the budget after one turn.
        let model = MockModel::new(TrainingMode::Base)
            .with_reply("a long reply")
            .without_eos();
        let config = SessionConfig {
            max_tokens: 5,
            ..SessionConfig::default()
        };
        let (result, output, _) = run_session(&model, config, "hello\nignored\n");
        assert_eq!(model.calls(), 1);
        assert!(result.abs_pos >= 5);
        assert!(output.contains("max_tokens (5) exceeded"));
    }

    #[test]
    fn test_streamed_response_appears_on_output() {
        let model = MockModel::new(TrainingMode::Base).with_reply("hello back");
        let (_, output, diag) = run_session(&model, SessionConfig::default(), "hi\n");
        assert!(output.contains("hello back"));
        assert!(diag.contains("[ Reading prompt ] "));
        // One dot per prompt token still being consumed (bos + 'h', with 'i'
        // falling through as the prompt tail).
        assert!(diag.contains(".."));
    }

    #[test]
    fn test_verbosity_two_reports_turn_statistics() {
        let model = MockModel::new(TrainingMode::Base).with_reply("ok");
        let config = SessionConfig {
            verbosity: 2,
            ..SessionConfig::default()
        };
        let (_, output, _) = run_session(&model, config, "hi\n");
        assert!(output.contains("tokens / sec"));
        assert!(output.contains("total tokens)"));
    }

    #[test]
    fn test_verbosity_zero_suppresses_input_prompt() {
        let model = MockModel::new(TrainingMode::Base).with_reply("ok");
        let config = SessionConfig {
            verbosity: 0,
            ..SessionConfig::default()
        };
        let (_, output, _) = run_session(&model, config, "hi\n");
        assert!(!output.contains("> "));
    }

    #[test]
    fn test_deterministic_sessions_are_byte_identical() {
        let config = SessionConfig {
            deterministic: true,
            ..SessionConfig::default()
        };
        let script = "tell me something\n";
        let mut streams = Vec::new();
        for _ in 0..2 {
            let model = MockModel::new(TrainingMode::InstructionTuned)
                .with_reply("a story")
                .with_rng_tail();
            let (_, output, diag) = run_session(&model, config.clone(), script);
            streams.push((output, diag));
        }
        assert_eq!(streams[0], streams[1]);
    }

    #[test]
    fn test_deterministic_reseed_replays_across_conversations() {
        // Outside multiturn mode each end-of-sequence ends the conversation
        // and reseeds, so the rng-derived tail of every turn is identical.
        let model = MockModel::new(TrainingMode::Base)
            .with_reply("x")
            .with_reply("x")
            .with_rng_tail();
        let config = SessionConfig {
            deterministic: true,
            ..SessionConfig::default()
        };
        run_session(&model, config, "one\ntwo\n");
        let tails = model.rng_tails();
        assert_eq!(tails.len(), 2);
        assert_eq!(tails[0], tails[1]);
    }
}
