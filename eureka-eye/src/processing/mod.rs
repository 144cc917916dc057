//! Prompt binding, result normalization and rendering

pub mod prompt;
pub mod render;
pub mod summary;

pub use prompt::{ClassList, PromptState, VisualPrompt};
pub use render::{rasterize_mask, render_result};
pub use summary::{summarize, NormalizedSummary};
