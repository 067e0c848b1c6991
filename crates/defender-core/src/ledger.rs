//! In-memory stand-in for the landlord-radar program accounts.
//!
//! Accounts are keyed by normalized street address. Lookups are fuzzy: a
//! query matches a key when either string contains the other, so
//! "1234 Harvey Mitchell Pkwy, College Station" resolves to the
//! "1234 harvey mitchell pkwy" account.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use rand::Rng;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::types::{Coordinates, PropertyAccount, TenantReview, COLLEGE_STATION};

/// Wallet shown as the author of reviews written through the demo.
pub const DEMO_WALLET: &str = "8xT...4jK";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReviewRejected {
    #[error("Smart Contract Error: TenancyNotVerified. You must prove tenancy to write to this PDA.")]
    TenancyNotVerified,
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),
    #[error("comment must not be empty")]
    EmptyComment,
}

/// Lowercase, cut at the first " (", drop `,` `.` `#`, collapse whitespace.
pub fn normalize_address(address: &str) -> String {
    let lower = address.trim().to_lowercase();
    let head = lower.split(" (").next().unwrap_or("");
    let cleaned: String = head
        .chars()
        .filter(|c| !matches!(c, ',' | '.' | '#'))
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Exact key first, then the first key that contains or is contained by the seed.
fn find_key<'a, I>(keys: I, seed: &str) -> Option<String>
where
    I: Iterator<Item = &'a String> + Clone,
{
    if seed.is_empty() {
        return None;
    }
    if let Some(k) = keys.clone().find(|k| k.as_str() == seed) {
        return Some(k.clone());
    }
    keys.into_iter()
        .find(|k| k.contains(seed) || seed.contains(k.as_str()))
        .cloned()
}

fn review(pubkey: &str, rating: u8, comment: &str, timestamp: i64, sig: &str) -> TenantReview {
    TenantReview {
        reviewer_pubkey: pubkey.into(),
        rating,
        comment: comment.into(),
        timestamp,
        is_verified: Some(true),
        tx_signature: Some(sig.into()),
    }
}

fn account(name: &str, violations: &[&str], lat: f64, lng: f64, r: TenantReview) -> PropertyAccount {
    PropertyAccount {
        address_hash: name.into(),
        violations: violations.iter().map(|v| v.to_string()).collect(),
        reviews: vec![r],
        coordinates: Coordinates { lat, lng },
    }
}

/// College Station demo properties plus a generic Austin fallback.
pub fn demo_accounts() -> BTreeMap<String, PropertyAccount> {
    let mut m = BTreeMap::new();
    m.insert(
        "1234 harvey mitchell pkwy".to_string(),
        account(
            "1234 Harvey Mitchell Pkwy (The Stack)",
            &["Illegal Late Fees", "Security Deposit Theft"],
            30.6333,
            -96.3667,
            review(
                "8xT...4jK",
                1,
                "They charged me $500 for paint that was already chipped. Glad this is on chain now.",
                1_698_754_321_000,
                "5gH...92x",
            ),
        ),
    );
    m.insert(
        "501 first st".to_string(),
        account(
            "501 First St (Park West)",
            &["Mold in HVAC", "Unannounced Entry"],
            30.6125,
            -96.3475,
            review(
                "EpZ...9x1",
                2,
                "Maintenance enters without 24hr notice. Documented it here.",
                1_699_123_456_000,
                "3jK...88L",
            ),
        ),
    );
    m.insert(
        "401 george bush dr".to_string(),
        account(
            "401 George Bush Dr (Callaway House)",
            &["Broken Elevator", "Pest Infestation"],
            30.6098,
            -96.3400,
            review(
                "WaLk...22X",
                1,
                "Elevator broken for 3 months. Rats in the trash chute.",
                1_700_112_233_000,
                "9mN...44P",
            ),
        ),
    );
    m.insert(
        "200 marion pugh dr".to_string(),
        account(
            "200 Marion Pugh Dr (The London)",
            &["Water Leaks"],
            30.6015,
            -96.3265,
            review(
                "R3nt...Lr0",
                2,
                "Roof leaked during the storm, management ignored it for a week.",
                1_701_223_344_000,
                "2qW...11M",
            ),
        ),
    );
    m.insert(
        "123 main st".to_string(),
        account(
            "123 Main St",
            &["Mold Infestation", "Illegal Late Fees", "HVAC Failure"],
            30.2672,
            -97.7431,
            review(
                "EpZ...9x1",
                2,
                "Landlord ignores maintenance requests for months.",
                1_698_754_321_000,
                "8uI...00K",
            ),
        ),
    );
    m
}

/// Geocoding fallback for addresses without an account.
const FALLBACK_COORDS: &[(&str, Coordinates)] = &[
    ("1234 harvey mitchell pkwy", Coordinates { lat: 30.6105, lng: -96.3255 }),
    ("501 first st", Coordinates { lat: 30.6125, lng: -96.3475 }),
    ("401 george bush dr", Coordinates { lat: 30.6098, lng: -96.3400 }),
    ("200 marion pugh dr", Coordinates { lat: 30.6015, lng: -96.3265 }),
];

/// Write to a sibling temp file, then rename it over `path`.
async fn write_snapshot(path: &Path, json: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, json)
        .await
        .with_context(|| format!("writing {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

/// `5gH...` + three base36 characters + `92x`.
fn fake_signature() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let mid: String = (0..3)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("5gH...{mid}92x")
}

pub struct Ledger {
    accounts: RwLock<BTreeMap<String, PropertyAccount>>,
    fetch_latency: Duration,
    write_latency: Duration,
    persist_path: Option<PathBuf>,
}

impl Ledger {
    /// Seeded, memory-only ledger with no simulated latency.
    pub fn in_memory() -> Self {
        Self {
            accounts: RwLock::new(demo_accounts()),
            fetch_latency: Duration::ZERO,
            write_latency: Duration::ZERO,
            persist_path: None,
        }
    }

    pub fn with_latency(mut self, fetch: Duration, write: Duration) -> Self {
        self.fetch_latency = fetch;
        self.write_latency = write;
        self
    }

    /// Seeded ledger backed by a JSON file. Saved accounts override the seeds.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut accounts = demo_accounts();
        if path.exists() {
            let data = std::fs::read_to_string(&path)
                .with_context(|| format!("reading ledger {}", path.display()))?;
            let saved: BTreeMap<String, PropertyAccount> = serde_json::from_str(&data)
                .with_context(|| format!("parsing ledger {}", path.display()))?;
            info!(path = %path.display(), accounts = saved.len(), "loaded ledger snapshot");
            accounts.extend(saved);
        }
        Ok(Self {
            accounts: RwLock::new(accounts),
            fetch_latency: Duration::ZERO,
            write_latency: Duration::ZERO,
            persist_path: Some(path),
        })
    }

    async fn simulate(&self, latency: Duration) {
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    pub async fn fetch_account(&self, address: &str) -> Option<PropertyAccount> {
        let seed = normalize_address(address);
        info!(seed = %seed, "fetching property account");
        self.simulate(self.fetch_latency).await;

        let accounts = self.accounts.read().await;
        find_key(accounts.keys(), &seed).and_then(|k| accounts.get(&k).cloned())
    }

    pub async fn list_accounts(&self) -> Vec<PropertyAccount> {
        self.accounts.read().await.values().cloned().collect()
    }

    /// Append a verified review and return its (fake) transaction signature.
    /// Creates the account at College Station centre when nothing matches.
    pub async fn add_review(
        &self,
        address: &str,
        rating: i64,
        comment: &str,
        proof_of_tenancy: bool,
    ) -> Result<String, ReviewRejected> {
        info!(address = %address, "invoking add_review");
        self.simulate(self.write_latency).await;

        if !proof_of_tenancy {
            warn!(address = %address, "review rejected: proof of tenancy required");
            return Err(ReviewRejected::TenancyNotVerified);
        }
        let stars = match u8::try_from(rating) {
            Ok(r @ 1..=5) => r,
            _ => return Err(ReviewRejected::InvalidRating(rating)),
        };
        if comment.trim().is_empty() {
            return Err(ReviewRejected::EmptyComment);
        }

        let signature = fake_signature();
        let normalized = normalize_address(address);

        // The write guard is held until the snapshot is on disk so saves
        // land one at a time and in mutation order.
        let mut accounts = self.accounts.write().await;
        let key = find_key(accounts.keys(), &normalized).unwrap_or(normalized);
        let account = accounts.entry(key).or_insert_with(|| PropertyAccount {
            address_hash: address.trim().to_string(),
            violations: Vec::new(),
            reviews: Vec::new(),
            coordinates: COLLEGE_STATION,
        });
        account.reviews.insert(
            0,
            TenantReview {
                reviewer_pubkey: DEMO_WALLET.into(),
                rating: stars,
                comment: comment.trim().to_string(),
                timestamp: chrono::Utc::now().timestamp_millis(),
                is_verified: Some(true),
                tx_signature: Some(signature.clone()),
            },
        );
        if let Some(path) = &self.persist_path {
            let saved = match serde_json::to_string_pretty(&*accounts) {
                Ok(json) => write_snapshot(path, &json).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = saved {
                warn!(path = %path.display(), "failed to persist ledger: {e:#}");
            }
        }
        drop(accounts);

        info!(signature = %signature, "review recorded");
        Ok(signature)
    }

    /// Account coordinates, then the fallback table, then College Station.
    pub async fn coordinates(&self, address: &str) -> Coordinates {
        let seed = normalize_address(address);
        {
            let accounts = self.accounts.read().await;
            if let Some(account) = find_key(accounts.keys(), &seed).and_then(|k| accounts.get(&k)) {
                return account.coordinates;
            }
        }
        if seed.is_empty() {
            return COLLEGE_STATION;
        }
        FALLBACK_COORDS
            .iter()
            .find(|(k, _)| k.contains(seed.as_str()) || seed.contains(*k))
            .map(|(_, c)| *c)
            .unwrap_or(COLLEGE_STATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_case_punctuation_and_parens() {
        assert_eq!(normalize_address("1234 Harvey Mitchell Pkwy"), "1234 harvey mitchell pkwy");
        assert_eq!(
            normalize_address("  1234 Harvey Mitchell Pkwy (The Stack) "),
            "1234 harvey mitchell pkwy"
        );
        assert_eq!(
            normalize_address("1234 harvey mitchell pkwy, college station"),
            "1234 harvey mitchell pkwy college station"
        );
        assert_eq!(normalize_address("501 First St., Apt #4"), "501 first st apt 4");
    }

    #[test]
    fn empty_seed_matches_nothing() {
        let keys = vec!["123 main st".to_string()];
        assert_eq!(find_key(keys.iter(), ""), None);
    }

    #[test]
    fn exact_key_wins_over_substring() {
        let keys = vec!["12 oak st".to_string(), "2 oak st".to_string()];
        assert_eq!(find_key(keys.iter(), "2 oak st"), Some("2 oak st".to_string()));
    }

    #[tokio::test]
    async fn fuzzy_lookup_is_case_and_punctuation_insensitive() {
        let ledger = Ledger::in_memory();
        let a = ledger.fetch_account("1234 Harvey Mitchell Pkwy").await.unwrap();
        let b = ledger
            .fetch_account("1234 harvey mitchell pkwy, college station")
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.address_hash, "1234 Harvey Mitchell Pkwy (The Stack)");
    }

    #[tokio::test]
    async fn unknown_address_is_none() {
        let ledger = Ledger::in_memory();
        assert!(ledger.fetch_account("99 Nowhere Ln").await.is_none());
        assert!(ledger.fetch_account("   ").await.is_none());
    }

    #[tokio::test]
    async fn coordinates_fall_back_to_college_station() {
        let ledger = Ledger::in_memory();
        let c = ledger.coordinates("501 First St, College Station, TX").await;
        assert_eq!(c, Coordinates { lat: 30.6125, lng: -96.3475 });
        assert_eq!(ledger.coordinates("77 Unknown Rd").await, COLLEGE_STATION);
    }

    #[test]
    fn fake_signature_shape() {
        let sig = fake_signature();
        assert!(sig.starts_with("5gH..."));
        assert!(sig.ends_with("92x"));
        assert_eq!(sig.len(), "5gH...".len() + 3 + 3);
    }
}
