// Prompt formatting: turn-boundary templating and control-token insertion.

use crate::error::ChatError;
use crate::model::{TokenId, Tokenizer, TrainingMode, BOS_TOKEN};

/// Apply the turn template to raw input text.
///
/// Instruction-tuned models get the Gemma control tokens around the user
/// turn; when the conversation is already underway (`abs_pos > 0`) the
/// previous model turn is closed first with a leading `<end_of_turn>`. Base
/// models take the text untouched.
pub fn apply_turn_template(raw_text: &str, mode: TrainingMode, abs_pos: usize) -> String {
    match mode {
        TrainingMode::Base => raw_text.to_string(),
        TrainingMode::InstructionTuned => {
            let wrapped =
                format!("<start_of_turn>user\n{raw_text}<end_of_turn>\n<start_of_turn>model\n");
            if abs_pos > 0 {
                // Continuation of a multi-turn dialogue.
                format!("<end_of_turn>\n{wrapped}")
            } else {
                wrapped
            }
        }
    }
}

/// Format raw input text into the token sequence for one turn.
///
/// Applies the turn template, encodes it, and prepends the
/// beginning-of-sequence token on the first turn of a conversation
/// (`abs_pos == 0`). Deterministic: identical inputs produce identical
/// token sequences. Position state is not touched here — the caller records
/// the returned length as the turn's prompt length.
pub fn format_prompt(
    tokenizer: &dyn Tokenizer,
    raw_text: &str,
    mode: TrainingMode,
    abs_pos: usize,
) -> Result<Vec<TokenId>, ChatError> {
    let text = apply_turn_template(raw_text, mode, abs_pos);
    let mut prompt = tokenizer.encode(&text)?;
    if abs_pos == 0 {
        prompt.insert(0, BOS_TOKEN);
    }
    Ok(prompt)
}
