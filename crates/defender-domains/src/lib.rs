//! Prompt authoring for each LLM-backed page.

pub mod contract;
pub mod evidence;
pub mod samples;
pub mod translate;

pub use contract::{build_contract_prompt, CONTRACT_SYSTEM};
pub use evidence::build_evidence_prompt;
pub use translate::{build_translation_prompt, language_name};
