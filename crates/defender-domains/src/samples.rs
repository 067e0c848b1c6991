//! Bundled sample analysis shown by the "try a sample" button.

use defender_core::types::{
    AnalysisResult, CategoryScore, Comparison, ContractType, Metric, MetricStatus, Risk, RiskScore,
    RiskSeverity, SampleAnalysis,
};

fn category(category: &str, score: u32, grade: &str, status: &str) -> CategoryScore {
    CategoryScore {
        category: category.into(),
        score,
        grade: grade.into(),
        status: status.into(),
    }
}

fn metric(
    label: &str,
    your_value: &str,
    market_avg: &str,
    difference: &str,
    status: MetricStatus,
    suggestion: Option<&str>,
) -> Metric {
    Metric {
        label: label.into(),
        your_value: your_value.into(),
        market_avg: market_avg.into(),
        difference: difference.into(),
        status,
        suggestion: suggestion.map(Into::into),
    }
}

fn lease_sample() -> SampleAnalysis {
    SampleAnalysis {
        name: "Apartment Lease Agreement".into(),
        contract_type: ContractType::Lease,
        analysis: AnalysisResult {
            risk_score: RiskScore {
                overall: 58,
                grade: "C-".into(),
                breakdown: vec![
                    category("Financial Terms", 72, "B", "good rent, bad fees"),
                    category("Legal Compliance", 45, "D", "2 unenforceable clauses"),
                    category("Tenant Rights", 65, "C", "weak maintenance terms"),
                    category("Hidden Costs", 35, "F", "$650/year in excessive fees"),
                ],
            },
            comparison: Comparison {
                location: "Austin, TX".into(),
                contracts_analyzed: 247,
                metrics: vec![
                    metric(
                        "Monthly Rent",
                        "$1,850",
                        "$1,720",
                        "+7.6%",
                        MetricStatus::Above,
                        Some("Ask for $130/month reduction to match market rate"),
                    ),
                    metric(
                        "Security Deposit",
                        "$1,850",
                        "$1,720",
                        "Market standard",
                        MetricStatus::Fair,
                        Some("This is standard (1 month rent)"),
                    ),
                    metric(
                        "Late Fee",
                        "$75",
                        "$28",
                        "+168%",
                        MetricStatus::Above,
                        Some("Illegal under TX law - demand $25 maximum"),
                    ),
                    metric(
                        "Pet Deposit",
                        "$300 + $25/mo",
                        "$200 + $15/mo",
                        "+50%",
                        MetricStatus::Above,
                        Some("Negotiate to $200 + $15/month"),
                    ),
                    metric(
                        "Lease Length",
                        "12 months",
                        "12 months",
                        "Market standard",
                        MetricStatus::Fair,
                        None,
                    ),
                ],
            },
            summary: vec![
                "Rent: $1,850/month (due on 1st of month)".into(),
                "Security deposit: $1,850 (refundable within 30 days)".into(),
                "Lease term: 12 months (March 1, 2026 - Feb 28, 2027)".into(),
                "Property: 2BR/1BA, 850 sq ft".into(),
                "Utilities: Tenant pays electric, water, gas".into(),
            ],
            risks: vec![
                Risk {
                    severity: RiskSeverity::High,
                    title: "Late fee exceeds legal maximum".into(),
                    description: "$75 late fee charged after 3-day grace period".into(),
                    standard: "Texas law caps late fees at the greater of $25 or 5% of monthly rent ($92.50 max for this lease)".into(),
                    savings: "$75 per incident".into(),
                    legal_code: Some("Texas Property Code §92.019".into()),
                    script: Some(
                        "Hi [Landlord Name],\n\nI noticed the lease lists a $75 late fee in Section 4.2. \
According to Texas Property Code §92.019, late fees are capped at the greater of $25 or 5% of monthly rent.\n\n\
For a $1,850/month lease, the legal maximum is $92.50, but I'd like to propose the standard $25 flat fee, \
which is common in the Austin market.\n\nCould we update Section 4.2 to reflect this? Happy to sign an addendum.\n\n\
Thanks,\n[Your Name]"
                            .into(),
                    ),
                },
                Risk {
                    severity: RiskSeverity::High,
                    title: "Illegal entry notice provision".into(),
                    description: "Landlord may enter with only 12 hours notice".into(),
                    standard: "Texas requires minimum 24-hour notice for non-emergency entry".into(),
                    savings: "Protection of privacy rights".into(),
                    legal_code: Some("Texas Property Code §92.0081".into()),
                    script: Some(
                        "Hi [Landlord Name],\n\nI see Section 8.1 allows entry with 12-hour notice. \
Texas Property Code §92.0081 requires at least 24 hours notice for non-emergency situations.\n\n\
Could we update this section to comply with state law? This protects both our interests.\n\n\
Best,\n[Your Name]"
                            .into(),
                    ),
                },
            ],
            total_savings: "$111+ annually, plus legal protections".into(),
        },
    }
}

/// Sample for `contract_type`. Only the lease sample is bundled, so every
/// type resolves to it.
pub fn sample_for(contract_type: ContractType) -> SampleAnalysis {
    match contract_type {
        ContractType::Lease | ContractType::Freelance | ContractType::JobOffer => lease_sample(),
    }
}
