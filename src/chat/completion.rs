// One-shot completion: a single non-interactive turn that returns the whole
// generated text at once instead of streaming it.

use std::time::Instant;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::chat::sink::AccumulatingSink;
use crate::chat::template::{apply_turn_template, format_prompt};
use crate::config::SessionConfig;
use crate::error::ChatError;
use crate::model::{TextModel, Tokenizer};

/// Complete `raw_text` in a single turn and return only the generated
/// continuation.
///
/// Always a fresh conversation: the prompt is formatted at absolute position
/// zero (beginning-of-sequence included, no continuation marker, even for
/// instruction-tuned models) and the rng is seeded from entropy — there is
/// no deterministic option on this path. The accumulated tokens are decoded
/// in one batch and the formatted prompt text is stripped from the front.
pub fn complete<M: TextModel, T: Tokenizer>(
    model: &M,
    tokenizer: &T,
    config: &SessionConfig,
    raw_text: &str,
) -> Result<String, ChatError> {
    let mut rng = StdRng::from_os_rng();
    let mode = model.training_mode();

    let prompt_text = apply_turn_template(raw_text, mode, 0);
    let prompt = format_prompt(tokenizer, raw_text, mode, 0)?;
    debug!("one-shot prompt: {} tokens", prompt.len());

    let mut sink = AccumulatingSink::default();
    let started = Instant::now();
    model.generate(&prompt, 0, &mut rng, &mut sink)?;

    let decoded = tokenizer.decode(sink.tokens())?;
    if config.verbosity >= 2 {
        info!(
            "one-shot completion: {} tokens in {:.2}s",
            sink.tokens().len(),
            started.elapsed().as_secs_f64()
        );
    }
    Ok(strip_prompt_prefix(&decoded, &prompt_text))
}

/// Remove the formatted prompt text from the front of the decoded output.
///
/// Prefers an exact prefix match. When the tokenizer's decode is not
/// byte-stable around control tokens, falls back to cutting the prompt's
/// byte length, moved forward to the next char boundary.
fn strip_prompt_prefix(decoded: &str, prompt_text: &str) -> String {
    if let Some(rest) = decoded.strip_prefix(prompt_text) {
        return rest.to_string();
    }
    let mut cut = prompt_text.len().min(decoded.len());
    while cut < decoded.len() && !decoded.is_char_boundary(cut) {
        cut += 1;
    }
    decoded[cut..].to_string()
}
