//! Stream filtering: banner suppression, prompt heuristics, and one-shot
//! output normalization.

mod banner;
pub mod normalize;
mod prompt;

pub use banner::BannerFilter;
pub use prompt::{PromptMatcher, ShellPromptMatcher};
