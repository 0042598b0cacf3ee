// Chat core: prompt formatting, stream sinks, the interactive session loop,
// and the one-shot completion path.

pub mod completion;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod session;
pub mod sink;
pub mod template;

pub use completion::complete;
pub use session::ChatSession;
pub use sink::{AccumulatingSink, ConversationState, InteractiveSink, PositionState};
pub use template::{apply_turn_template, format_prompt};
