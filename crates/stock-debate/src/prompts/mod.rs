//! Prompt templates
//!
//! - `system`: system prompts for the analysts, the judge and the symbol lookup
//! - `user`: MiniJinja user message templates

mod system;
mod user;

pub use system::*;
pub use user::*;
