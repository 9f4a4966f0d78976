// Shared prompt fragments. Each feature that calls the model keeps its own
// prompts.rs next to it and appends these where needed.

/// Closing instruction that asks for bare JSON. The model does not always
/// honor it, so callers still strip code fences before parsing.
pub const JSON_ONLY_INSTRUCTION: &str = "IMPORTANT: Return ONLY valid JSON. No markdown code blocks.";
