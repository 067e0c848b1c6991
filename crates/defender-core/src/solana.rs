//! Devnet faucet proxy. Only the three JSON-RPC calls the evidence locker
//! needs: `requestAirdrop`, `getSignatureStatuses` and `getBalance`.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::{Config, PUBLIC_DEVNET_RPC};

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
/// Longest base58 encoding of a 32-byte key.
pub const MAX_PUBKEY_CHARS: usize = 44;
const CONFIRM_POLL: Duration = Duration::from_secs(1);

/// Decode a base58 string (Bitcoin alphabet).
pub fn decode_base58(s: &str) -> Result<Vec<u8>> {
    let mut bytes: Vec<u8> = Vec::with_capacity(s.len());
    for c in s.bytes() {
        let digit = BASE58_ALPHABET
            .iter()
            .position(|&a| a == c)
            .ok_or_else(|| anyhow!("invalid base58 character {:?}", c as char))?;
        let mut carry = digit as u32;
        for b in bytes.iter_mut().rev() {
            carry += (*b as u32) * 58;
            *b = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.insert(0, (carry & 0xff) as u8);
            carry >>= 8;
        }
    }
    let leading_zeros = s.bytes().take_while(|&c| c == b'1').count();
    let mut out = vec![0u8; leading_zeros];
    out.extend(bytes);
    Ok(out)
}

/// A wallet address: base58 that decodes to exactly 32 bytes.
pub fn validate_pubkey(s: &str) -> Result<()> {
    let s = s.trim();
    if s.len() > MAX_PUBKEY_CHARS {
        bail!("public key is {} characters, at most {MAX_PUBKEY_CHARS} allowed", s.len());
    }
    let decoded = decode_base58(s)?;
    if decoded.len() != 32 {
        bail!("public key must be 32 bytes, got {}", decoded.len());
    }
    Ok(())
}

pub fn is_faucet_rate_limited(message: &str) -> bool {
    let m = message.to_lowercase();
    m.contains("403") || m.contains("429") || m.contains("rate limit") || m.contains("limit exceeded")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AirdropCode {
    RateLimited,
    AirdropFailed,
}

#[derive(Debug, Clone)]
pub struct AirdropFailure {
    pub message: String,
    pub code: AirdropCode,
}

impl AirdropFailure {
    fn from_message(message: Option<String>) -> Self {
        let message = message.unwrap_or_else(|| "Airdrop failed".into());
        let code = if is_faucet_rate_limited(&message) {
            AirdropCode::RateLimited
        } else {
            AirdropCode::AirdropFailed
        };
        Self { message, code }
    }
}

pub struct Faucet {
    client: Client,
    rpcs: Vec<String>,
    lamports: u64,
    max_retries: u32,
    retry_delay: Duration,
    confirm_timeout: Duration,
}

impl Faucet {
    pub fn new(rpcs: Vec<String>, lamports: u64) -> Self {
        Self {
            client: Client::new(),
            rpcs,
            lamports,
            max_retries: 2,
            retry_delay: Duration::from_secs(4),
            confirm_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.airdrop_rpcs(), config.airdrop_lamports)
            .with_retries(config.airdrop_max_retries, Duration::from_millis(config.airdrop_retry_delay_ms))
    }

    pub fn with_retries(mut self, max_retries: u32, delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = delay;
        self
    }

    async fn rpc(&self, url: &str, method: &str, params: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let resp = self
            .client
            .post(url)
            .timeout(Duration::from_secs(20))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("{method} request"))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("{method} failed with HTTP {status}: {text}");
        }
        let v: Value = resp.json().await.with_context(|| format!("{method} parse"))?;
        if let Some(err) = v.get("error") {
            let code = err["code"].as_i64().unwrap_or(0);
            let message = err["message"].as_str().unwrap_or("unknown error");
            bail!("{method} error {code}: {message}");
        }
        Ok(v["result"].clone())
    }

    async fn confirm(&self, url: &str, signature: &str) -> Result<()> {
        let deadline = tokio::time::Instant::now() + self.confirm_timeout;
        loop {
            let result = self
                .rpc(
                    url,
                    "getSignatureStatuses",
                    json!([[signature], {"searchTransactionHistory": true}]),
                )
                .await?;
            let status = &result["value"][0];
            if !status.is_null() {
                if !status["err"].is_null() {
                    bail!("airdrop transaction failed: {}", status["err"]);
                }
                if matches!(
                    status["confirmationStatus"].as_str(),
                    Some("confirmed") | Some("finalized")
                ) {
                    return Ok(());
                }
            }
            if tokio::time::Instant::now() >= deadline {
                bail!("airdrop {signature} not confirmed in time (blockhash expired?)");
            }
            tokio::time::sleep(CONFIRM_POLL).await;
        }
    }

    /// One airdrop round trip. `None` when the balance is still zero after confirmation.
    async fn try_airdrop(&self, url: &str, pubkey: &str) -> Result<Option<String>> {
        let result = self
            .rpc(
                url,
                "requestAirdrop",
                json!([pubkey, self.lamports, {"commitment": "confirmed"}]),
            )
            .await?;
        let signature = result
            .as_str()
            .ok_or_else(|| anyhow!("requestAirdrop returned no signature"))?
            .to_string();
        self.confirm(url, &signature).await?;

        let balance = self
            .rpc(url, "getBalance", json!([pubkey, {"commitment": "confirmed"}]))
            .await?;
        let lamports = balance["value"].as_u64().unwrap_or(0);
        Ok((lamports > 0).then_some(signature))
    }

    /// Fund `pubkey`, trying each RPC in turn. A rate-limited private RPC
    /// skips straight to the public fallback.
    pub async fn request_airdrop(&self, pubkey: &str) -> Result<String, AirdropFailure> {
        let mut last_error: Option<String> = None;
        for url in &self.rpcs {
            for attempt in 1..=self.max_retries {
                info!(rpc = %url, attempt, "requesting devnet airdrop");
                match self.try_airdrop(url, pubkey).await {
                    Ok(Some(signature)) => {
                        info!(signature = %signature, "airdrop confirmed");
                        return Ok(signature);
                    }
                    Ok(None) => {
                        warn!(rpc = %url, attempt, "airdrop confirmed but balance is zero");
                        last_error = Some("Airdrop did not fund the account".into());
                    }
                    Err(e) => {
                        let msg = format!("{e:#}");
                        warn!(rpc = %url, attempt, "airdrop failed: {msg}");
                        let rate_limited = is_faucet_rate_limited(&msg);
                        last_error = Some(msg);
                        if rate_limited && url != PUBLIC_DEVNET_RPC {
                            break;
                        }
                        if attempt < self.max_retries {
                            tokio::time::sleep(self.retry_delay).await;
                        }
                    }
                }
            }
        }
        Err(AirdropFailure::from_message(last_error))
    }
}
