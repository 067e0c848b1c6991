use defender_core::types::ContractType;
use defender_domains::contract::{build_contract_prompt, guidance};
use defender_domains::samples::sample_for;

// ── Contract prompt ─────────────────────────────────────────────────────────

#[test]
fn test_unknown_type_uses_lease_guidance() {
    let unknown = build_contract_prompt(Some("timeshare"), "Rent is $975 per month.");
    for category in guidance(ContractType::Lease).categories {
        assert!(unknown.contains(&format!("\"category\": \"{category}\"")));
    }
    assert!(unknown.contains("Focus on: late fees, security deposits"));
    assert!(unknown.contains("LEASE VALUE EXTRACTION"));
}

#[test]
fn test_freelance_prompt_uses_freelance_categories() {
    let p = build_contract_prompt(Some("freelance"), "Net-60 payment terms");
    assert!(p.contains("\"category\": \"IP Rights\""));
    assert!(p.contains("Focus on: revision limits"));
    assert!(!p.contains("\"category\": \"Tenant Rights\""));
}

#[test]
fn test_contract_text_is_last_and_untruncated() {
    let text = "x".repeat(50_000);
    let p = build_contract_prompt(Some("lease"), &text);
    assert!(p.ends_with(&format!("CONTRACT TEXT:\n{text}")));
}

#[test]
fn test_prompt_demands_json_only() {
    let p = build_contract_prompt(None, "text");
    assert!(p.contains("Return ONLY valid JSON, no markdown."));
    assert!(defender_domains::CONTRACT_SYSTEM.contains("Not in contract"));
}

// ── Samples ─────────────────────────────────────────────────────────────────

#[test]
fn test_lease_sample_shape() {
    let sample = sample_for(ContractType::Lease);
    assert_eq!(sample.analysis.risk_score.overall, 58);
    assert_eq!(sample.analysis.risk_score.breakdown.len(), 4);
    assert_eq!(sample.analysis.comparison.metrics.len(), 5);

    let v = serde_json::to_value(&sample).unwrap();
    assert_eq!(v["type"], "lease");
    assert_eq!(v["riskScore"]["grade"], "C-");
    assert_eq!(v["comparison"]["contractsAnalyzed"], 247);
    assert_eq!(v["comparison"]["metrics"][4]["suggestion"], serde_json::Value::Null);
    assert_eq!(v["risks"][0]["legalCode"], "Texas Property Code §92.019");
}

#[test]
fn test_missing_samples_fall_back_to_lease() {
    let sample = sample_for(ContractType::JobOffer);
    assert_eq!(sample.contract_type, ContractType::Lease);
    assert_eq!(sample.name, "Apartment Lease Agreement");
}
