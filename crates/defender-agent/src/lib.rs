pub mod analyst;
pub mod gemini;

pub use analyst::{AnalysisError, Analyst};
pub use gemini::GeminiBackend;
