pub mod config;
pub mod evidence;
pub mod extract;
pub mod ledger;
pub mod llm;
pub mod normalize;
pub mod retry;
pub mod solana;
pub mod tenancy;
pub mod types;

pub use types::*;
