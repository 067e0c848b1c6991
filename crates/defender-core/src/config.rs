use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;

use crate::retry::RetryPolicy;

pub const PUBLIC_DEVNET_RPC: &str = "https://api.devnet.solana.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Full application configuration.
/// Everything comes from the process environment first, then a local `.env`.
/// The Gemini key is the only secret and is never logged.
#[derive(Debug, Clone)]
pub struct Config {
    // Gemini
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub gemini_timeout_s: u64,
    pub gemini_temperature: f32,

    // Backoff on 429
    pub analyze_retry_delay_ms: u64,
    pub analyze_max_retries: u32,
    /// Delays for translation and evidence analysis, e.g. "2000,5000,10000".
    pub llm_retry_schedule_ms: Vec<u64>,

    // Devnet faucet
    pub solana_rpc_url: String,
    pub airdrop_lamports: u64,
    pub airdrop_max_retries: u32,
    pub airdrop_retry_delay_ms: u64,

    // Web
    pub web_bind: String,
    pub web_port: u16,
    pub static_dir: String,
    pub max_json_bytes: usize,
    pub max_upload_bytes: usize,

    // Landlord radar
    /// Empty keeps the ledger in memory only.
    pub ledger_path: String,
    pub radar_fetch_latency_ms: u64,
    pub radar_write_latency_ms: u64,
}

fn parse_dotenv() -> HashMap<String, String> {
    let Ok(contents) = std::fs::read_to_string(".env") else {
        return HashMap::new();
    };
    parse_dotenv_str(&contents)
}

pub(crate) fn parse_dotenv_str(contents: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            let v = v.trim().trim_matches('"');
            map.insert(k.trim().to_string(), v.to_string());
        }
    }
    map
}

fn get(key: &str, dotenv: &HashMap<String, String>) -> Option<String> {
    std::env::var(key).ok().or_else(|| dotenv.get(key).cloned())
}

fn get_str(key: &str, dotenv: &HashMap<String, String>, default: &str) -> String {
    get(key, dotenv).unwrap_or_else(|| default.to_string())
}

fn get_u32(key: &str, dotenv: &HashMap<String, String>, default: u32) -> u32 {
    get(key, dotenv)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn get_u64(key: &str, dotenv: &HashMap<String, String>, default: u64) -> u64 {
    get(key, dotenv)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn get_u16(key: &str, dotenv: &HashMap<String, String>, default: u16) -> u16 {
    get(key, dotenv)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn get_usize(key: &str, dotenv: &HashMap<String, String>, default: usize) -> usize {
    get(key, dotenv)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn get_f32(key: &str, dotenv: &HashMap<String, String>, default: f32) -> f32 {
    get(key, dotenv)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse a comma-separated millisecond list. Unparseable entries are skipped;
/// an empty result falls back to `default`.
pub(crate) fn parse_schedule(raw: &str, default: &[u64]) -> Vec<u64> {
    let parsed: Vec<u64> = raw
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    if parsed.is_empty() {
        default.to_vec()
    } else {
        parsed
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_map(&parse_dotenv())
    }

    /// Build from an explicit key/value map (env vars still take precedence).
    pub fn from_map(dotenv: &HashMap<String, String>) -> Result<Self> {
        let schedule_raw = get_str("LLM_RETRY_SCHEDULE_MS", dotenv, "");

        let config = Config {
            gemini_api_key: get_str("GEMINI_API_KEY", dotenv, ""),
            gemini_model: get_str("GEMINI_MODEL", dotenv, DEFAULT_GEMINI_MODEL),
            gemini_base_url: get_str("GEMINI_BASE_URL", dotenv, DEFAULT_GEMINI_BASE_URL),
            gemini_timeout_s: get_u64("GEMINI_TIMEOUT_S", dotenv, 120),
            gemini_temperature: get_f32("GEMINI_TEMPERATURE", dotenv, 0.3),
            analyze_retry_delay_ms: get_u64("ANALYZE_RETRY_DELAY_MS", dotenv, 17_000),
            analyze_max_retries: get_u32("ANALYZE_MAX_RETRIES", dotenv, 1),
            llm_retry_schedule_ms: parse_schedule(&schedule_raw, &[2_000, 5_000, 10_000]),
            solana_rpc_url: get_str("SOLANA_DEVNET_RPC", dotenv, PUBLIC_DEVNET_RPC),
            // 0.01 SOL: enough for ~100 memo transactions a day within a 1 SOL faucet cap
            airdrop_lamports: get_u64("AIRDROP_LAMPORTS", dotenv, 10_000_000),
            airdrop_max_retries: get_u32("AIRDROP_MAX_RETRIES", dotenv, 2),
            airdrop_retry_delay_ms: get_u64("AIRDROP_RETRY_DELAY_MS", dotenv, 4_000),
            web_bind: get_str("WEB_BIND", dotenv, "127.0.0.1"),
            web_port: get_u16("PORT", dotenv, 3000),
            static_dir: get_str("STATIC_DIR", dotenv, "frontend/dist"),
            max_json_bytes: get_usize("MAX_JSON_BYTES", dotenv, 2 * 1024 * 1024),
            max_upload_bytes: get_usize("MAX_UPLOAD_BYTES", dotenv, 25 * 1024 * 1024),
            ledger_path: get_str("LEDGER_PATH", dotenv, ""),
            radar_fetch_latency_ms: get_u64("RADAR_FETCH_LATENCY_MS", dotenv, 600),
            radar_write_latency_ms: get_u64("RADAR_WRITE_LATENCY_MS", dotenv, 2_000),
        };

        if config.airdrop_max_retries == 0 {
            anyhow::bail!("AIRDROP_MAX_RETRIES must be at least 1");
        }
        Ok(config)
    }

    pub fn gemini_configured(&self) -> bool {
        !self.gemini_api_key.is_empty()
    }

    /// Fixed delay used by contract analysis.
    pub fn analyze_retry(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            Duration::from_millis(self.analyze_retry_delay_ms),
            self.analyze_max_retries,
        )
    }

    /// Exponential schedule used by translation and evidence analysis.
    pub fn llm_retry(&self) -> RetryPolicy {
        RetryPolicy::schedule(
            self.llm_retry_schedule_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        )
    }

    /// RPC endpoints to try in order; the public RPC is the fallback.
    pub fn airdrop_rpcs(&self) -> Vec<String> {
        if self.solana_rpc_url == PUBLIC_DEVNET_RPC {
            vec![self.solana_rpc_url.clone()]
        } else {
            vec![self.solana_rpc_url.clone(), PUBLIC_DEVNET_RPC.to_string()]
        }
    }
}
