use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::types::SecuredRecord;

pub const MEMO_PROGRAM_ID: &str = "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcQb";

/// Lowercase hex SHA-256 of the file contents.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn memo_text(file_hash: &str, file_name: &str) -> String {
    format!("LegalDefender Proof: {file_hash} | File: {file_name}")
}

pub fn explorer_url(signature: &str) -> String {
    format!("https://explorer.solana.com/tx/{signature}?cluster=devnet")
}

/// What the browser wallet needs to build the memo instruction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoDraft {
    pub file_name: String,
    pub file_hash: String,
    pub memo: String,
    pub memo_program_id: &'static str,
}

pub fn draft_memo(file_name: &str, bytes: &[u8]) -> MemoDraft {
    let file_hash = sha256_hex(bytes);
    MemoDraft {
        memo: memo_text(&file_hash, file_name),
        file_name: file_name.to_string(),
        file_hash,
        memo_program_id: MEMO_PROGRAM_ID,
    }
}

/// Certificate for a memo transaction the wallet has confirmed.
pub fn secured_record(file_name: &str, file_hash: &str, signature: &str) -> SecuredRecord {
    SecuredRecord {
        file_name: file_name.to_string(),
        file_hash: file_hash.to_lowercase(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        signature: signature.to_string(),
        explorer_url: explorer_url(signature),
    }
}

/// A SHA-256 digest rendered as 64 hex characters.
pub fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}
