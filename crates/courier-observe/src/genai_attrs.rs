//! OpenTelemetry GenAI Semantic Convention attribute names.
//!
//! The conversation client opens a `gen_ai.chat` span declaring these fields
//! as empty; backends fill them in with `Span::current().record(..)` once the
//! reply is parsed.

/// Prompt tokens as reported by the provider.
pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

/// Candidate tokens as reported by the provider.
pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// Finish reason of the first candidate (e.g., "STOP", "MAX_TOKENS").
pub const GEN_AI_RESPONSE_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";

/// Value of `gen_ai.provider.name` for Google Gemini.
pub const PROVIDER_GEMINI: &str = "gemini";
