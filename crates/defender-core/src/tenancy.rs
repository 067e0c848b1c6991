//! Proof-of-tenancy gate checked before a review may be written.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenancyCheck {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TenancyCheck {
    fn pass() -> Self {
        Self {
            verified: true,
            error: None,
        }
    }

    fn fail(property_name: &str) -> Self {
        Self {
            verified: false,
            error: Some(format!(
                "Lease address does not match \"{property_name}\". Access Denied."
            )),
        }
    }
}

/// "1234 Harvey Mitchell Pkwy (The Stack), College Station" → "1234 harvey mitchell pkwy".
pub fn street_of(property_name: &str) -> String {
    let lower = property_name.to_lowercase();
    let head = lower.split(',').next().unwrap_or("");
    head.split('(').next().unwrap_or("").trim().to_string()
}

/// Fast path: the upload's file name mentions the street's second word
/// (e.g. `lease_1234_harvey.pdf`), or "lease" when the street has one word.
pub fn filename_matches(property_name: &str, file_name: &str) -> bool {
    let street = street_of(property_name);
    let needle = street
        .split_whitespace()
        .nth(1)
        .unwrap_or("lease")
        .to_string();
    file_name.to_lowercase().contains(&needle)
}

/// Fraction of the street's significant words (longer than two characters)
/// that appear in `text`.
pub fn address_match_ratio(property_name: &str, text: &str) -> f64 {
    let street = street_of(property_name);
    let parts: Vec<&str> = street.split_whitespace().filter(|p| p.len() > 2).collect();
    if parts.is_empty() {
        return 0.0;
    }
    let lower = text.to_lowercase();
    let matched = parts.iter().filter(|p| lower.contains(*p)).count();
    matched as f64 / parts.len() as f64
}

/// Check a lease against a property. `text` is only consulted when the file
/// name alone does not identify the property; pass `None` when the text
/// could not be extracted.
pub fn verify_lease(property_name: &str, file_name: &str, text: Option<&str>) -> TenancyCheck {
    if filename_matches(property_name, file_name) {
        return TenancyCheck::pass();
    }
    let Some(text) = text else {
        return TenancyCheck {
            verified: false,
            error: Some("Document parsing failed. Please upload a clear PDF/Image.".into()),
        };
    };
    if address_match_ratio(property_name, text) >= 0.5 || text.to_lowercase().contains("lease") {
        TenancyCheck::pass()
    } else {
        TenancyCheck::fail(property_name)
    }
}
