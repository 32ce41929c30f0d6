//! Prompt context assembly.
//!
//! Turns retrieved passages, plus an optional caller-selected excerpt, into the
//! bounded grounding block handed to the generation model.
//!
//! ## Rules
//!
//! - Selected text always comes first, whatever the retrieval scores say.
//! - Passages follow in descending score order.
//! - Size is counted in chars. A passage that would push the total past the
//!   budget is dropped whole and admission stops there; passages are never cut
//!   mid-text.
//! - Selected text larger than the budget is clipped at a char boundary so the
//!   total never exceeds the budget.
//! - `source_list` only names passages that made it into the context.
//!
//! ## Pure function guarantee
//!
//! No I/O and no failure modes. Same passages, selection and budget give the same
//! context every time.

mod assemble;
mod document;

pub use crate::assemble::assemble;
pub use crate::document::{AssembledContext, NO_CONTEXT_MARKER};
