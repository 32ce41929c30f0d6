use context::AssembledContext;
use generation::{DECLINE_MESSAGE, GenerationRequest};

/// Builds the system instruction that pins the model to the supplied context.
pub fn system_instruction() -> String {
    format!(
        "You are a helpful assistant for the AI Humanoid Robotics textbook. \
         Answer the user's question based only on the provided context. \
         If the answer is not in the context, or the context says no context is available, \
         reply exactly: '{DECLINE_MESSAGE}'"
    )
}

/// Builds the generation request for `question` grounded on `context`.
///
/// The question is embedded verbatim.
pub fn build_request(context: &AssembledContext, question: &str) -> GenerationRequest {
    GenerationRequest {
        system: system_instruction(),
        user: format!("Context:\n{}\n\nQuestion:\n{question}", context.render()),
        grounding: context.ordered_chunks.clone(),
    }
}
