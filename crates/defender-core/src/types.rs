use serde::{Deserialize, Serialize};

// ── Contract analysis ────────────────────────────────────────────────────

/// Contract families with dedicated prompt guidance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractType {
    #[default]
    #[serde(rename = "lease")]
    Lease,
    #[serde(rename = "freelance")]
    Freelance,
    #[serde(rename = "jobOffer")]
    JobOffer,
}

impl ContractType {
    pub const ALL: [ContractType; 3] = [Self::Lease, Self::Freelance, Self::JobOffer];

    /// Unknown or missing types fall back to `Lease`.
    pub fn from_str_or_lease(s: Option<&str>) -> Self {
        match s {
            Some("freelance") => Self::Freelance,
            Some("jobOffer") => Self::JobOffer,
            _ => Self::Lease,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lease => "lease",
            Self::Freelance => "freelance",
            Self::JobOffer => "jobOffer",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisResult {
    pub risk_score: RiskScore,
    pub comparison: Comparison,
    pub summary: Vec<String>,
    pub risks: Vec<Risk>,
    pub total_savings: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskScore {
    pub overall: u32,
    pub grade: String,
    pub breakdown: Vec<CategoryScore>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryScore {
    pub category: String,
    pub score: u32,
    pub grade: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comparison {
    pub location: String,
    pub contracts_analyzed: u32,
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    Above,
    Below,
    #[default]
    Fair,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metric {
    pub label: String,
    pub your_value: String,
    pub market_avg: String,
    pub difference: String,
    pub status: MetricStatus,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskSeverity {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Risk {
    pub severity: RiskSeverity,
    pub title: String,
    pub description: String,
    pub standard: String,
    pub savings: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

/// A bundled analysis the UI can show without calling the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleAnalysis {
    pub name: String,
    #[serde(rename = "type")]
    pub contract_type: ContractType,
    #[serde(flatten)]
    pub analysis: AnalysisResult,
}

// ── Landlord radar ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// College Station, TX; used when nothing better is known.
pub const COLLEGE_STATION: Coordinates = Coordinates {
    lat: 30.6280,
    lng: -96.3344,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantReview {
    pub reviewer_pubkey: String,
    pub rating: u8,
    pub comment: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_signature: Option<String>,
}

/// Simulated program account for one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyAccount {
    /// Display name; the lookup key is the normalized address.
    pub address_hash: String,
    pub violations: Vec<String>,
    pub reviews: Vec<TenantReview>,
    pub coordinates: Coordinates,
}

// ── Evidence locker ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuredRecord {
    pub file_name: String,
    pub file_hash: String,
    pub timestamp: String,
    pub signature: String,
    pub explorer_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_is_the_default_contract_type() {
        assert_eq!(ContractType::default(), ContractType::Lease);
        assert_eq!(ContractType::from_str_or_lease(Some("nda")), ContractType::default());
        let parsed: ContractType = serde_json::from_str("\"jobOffer\"").unwrap();
        assert_eq!(parsed, ContractType::JobOffer);
    }
}
