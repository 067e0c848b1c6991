//! Contract-scanner prompts: per-type guidance and the analysis instruction.

use defender_core::types::ContractType;

pub const CONTRACT_SYSTEM: &str = "You are an expert legal contract analyzer helping the user analyze their own contract. \
Extract EXACT values from the contract text: if rent is $1,850, write \"$1,850\". \
NEVER use \"not specified\", \"obfuscated\", \"redacted\", or placeholders. \
If a term is not in the contract, use \"Not in contract\". Return only valid JSON, no markdown.";

/// Breakdown categories and focus issues for one contract family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guidance {
    pub categories: [&'static str; 4],
    pub issues: &'static str,
}

pub fn guidance(contract_type: ContractType) -> Guidance {
    match contract_type {
        ContractType::Lease => Guidance {
            categories: ["Financial Terms", "Legal Compliance", "Tenant Rights", "Hidden Costs"],
            issues: "late fees, security deposits, maintenance response times, entry notice, pet fees",
        },
        ContractType::Freelance => Guidance {
            categories: ["Payment Terms", "Scope Protection", "IP Rights", "Legal Protection"],
            issues: "revision limits, payment terms, IP ownership, late fees, kill fees",
        },
        ContractType::JobOffer => Guidance {
            categories: ["Compensation", "Benefits", "Non-Compete", "Equity Terms"],
            issues: "non-compete scope, equity vesting, PTO, salary benchmarks",
        },
    }
}

pub fn comparison_instruction(contract_type: ContractType) -> &'static str {
    match contract_type {
        ContractType::Lease => {
            "comparison.metrics MUST include 5-6 items. Monthly Rent: yourValue = MONTHLY amount only \
(if contract shows total like $11,700/12mo, use $975, i.e. divide total by months). Security Deposit, Late Fee, \
Pet Deposit (if any), Lease Length, Entry Notice. For each: label, yourValue, marketAvg (e.g. $1,000 for 1br \
College Station), difference, status (\"above\"|\"below\"|\"fair\"), suggestion."
        }
        ContractType::Freelance => {
            "comparison.metrics MUST include 5-6 items. Extract: Hourly/Project Rate, Payment Terms (e.g. Net-30), \
Revision Rounds, Late Payment Penalty, IP Ownership. For each: label, yourValue (from contract), marketAvg \
(industry typical), difference, status (\"above\"|\"below\"|\"fair\"), suggestion."
        }
        ContractType::JobOffer => {
            "comparison.metrics MUST include 5-6 items. Extract: Base Salary, Equity/Options Grant, PTO Days, \
401k Match, Vesting Schedule, Non-Compete Scope. For each: label, yourValue (from contract), marketAvg \
(market typical), difference, status (\"above\"|\"below\"|\"fair\"), suggestion."
        }
    }
}

const LEASE_EXTRACTION_RULES: &str = "CRITICAL - LEASE VALUE EXTRACTION:
- Monthly Rent: Extract the amount due EACH month. If the contract shows a TOTAL for the lease (e.g. $11,700 for 12 months), divide: $11,700 / 12 = $975/month. NEVER use the total lease amount as monthly rent. Look for \"monthly rent\", \"rent per month\", \"base rent\", or total / number of months.
- Security Deposit: \"security deposit\", \"deposit\", \"refundable deposit\"
- Late Fee: \"late fee\", \"late charge\", \"delinquency fee\"
- Pet Deposit/Fee: \"pet deposit\", \"pet fee\", \"pet rent\"
- Lease Length: \"term\", \"12 months\", \"month to month\"
Search every page and addendum. Extract EXACT values. Never use \"Not in contract\" for rent or deposit.";

const COMPLETENESS_RULES: &str = "CRITICAL - summary: Must be 5-7 plain-English bullet points with ACTUAL values. Do NOT return category headers like \"Financial Terms:\" or \"Legal Compliance:\" with no content. Each summary item must include the real value/description.

CRITICAL - comparison.metrics: Each object MUST have label, yourValue, marketAvg, difference, status, suggestion. Never leave label empty.

CRITICAL - risks[]: Each risk MUST have ALL fields: title, description, standard, savings, legalCode, script. Never leave title, description, or standard empty.";

/// Build the analysis prompt. `raw_type` is echoed in the header as given;
/// guidance for unknown or missing types falls back to the lease family.
pub fn build_contract_prompt(raw_type: Option<&str>, contract_text: &str) -> String {
    let kind = ContractType::from_str_or_lease(raw_type);
    let label = raw_type.filter(|t| !t.trim().is_empty()).unwrap_or("lease");
    let g = guidance(kind);
    let [c0, c1, c2, c3] = g.categories;
    let comparison = comparison_instruction(kind);

    format!(
        r#"Analyze this {label} contract and return a JSON object with this EXACT structure:

{{
  "riskScore": {{
    "overall": <number 0-100>,
    "grade": "<letter grade e.g. B+ or C->",
    "breakdown": [
      {{"category": "{c0}", "score": <0-100>, "grade": "<A-F>", "status": "<short description>"}},
      {{"category": "{c1}", "score": <0-100>, "grade": "<A-F>", "status": "<short description>"}},
      {{"category": "{c2}", "score": <0-100>, "grade": "<A-F>", "status": "<short description>"}},
      {{"category": "{c3}", "score": <0-100>, "grade": "<A-F>", "status": "<short description>"}}
    ]
  }},
  "comparison": {{
    "location": "<infer city/state from contract or use region e.g. National>",
    "contractsAnalyzed": <number 150-300>,
    "metrics": [
      {{"label": "Metric Name", "yourValue": "from contract", "marketAvg": "typical", "difference": "+X% or Market standard", "status": "above/below/fair", "suggestion": "advice or null"}}
    ]
  }},
  "summary": ["plain-English bullet with actual value 1", "bullet 2", "bullet 3"],
  "risks": [
    {{"severity": "high or medium or low", "title": "issue title", "description": "what is wrong", "standard": "what is normal", "savings": "$ or description", "legalCode": "law ref or null", "script": "email template with [Name] placeholders"}}
  ],
  "totalSavings": "e.g. $500+ annually"
}}

{extraction}

CRITICAL - Market comparison: {comparison}
yourValue = EXACT value from contract. marketAvg = typical benchmark.

{COMPLETENESS_RULES}

Focus on: {issues}
Return ONLY valid JSON, no markdown.

CONTRACT TEXT:
{contract_text}"#,
        extraction = extraction_rules(kind),
        issues = g.issues,
    )
}

fn extraction_rules(kind: ContractType) -> &'static str {
    match kind {
        ContractType::Lease => LEASE_EXTRACTION_RULES,
        _ => "CRITICAL - Value extraction: yourValue MUST be the EXACT value from the contract text (e.g. \"$1,850\", \"30 days\", \"Net-30\"). NEVER use \"not specified\", \"obfuscated\", \"N/A\" when the value appears in the contract. Only use \"Not in contract\" if the term is truly absent.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_type_has_four_categories() {
        for t in ContractType::ALL {
            let g = guidance(t);
            assert!(g.categories.iter().all(|c| !c.is_empty()));
            assert!(comparison_instruction(t).starts_with("comparison.metrics MUST include 5-6 items"));
        }
    }

    #[test]
    fn header_keeps_raw_type() {
        let p = build_contract_prompt(Some("roommate"), "text");
        assert!(p.starts_with("Analyze this roommate contract"));
        let p = build_contract_prompt(None, "text");
        assert!(p.starts_with("Analyze this lease contract"));
    }

    #[test]
    fn non_lease_types_use_generic_extraction() {
        let p = build_contract_prompt(Some("jobOffer"), "Base salary $120,000");
        assert!(p.contains("\"category\": \"Compensation\""));
        assert!(!p.contains("LEASE VALUE EXTRACTION"));
        assert!(p.contains("CRITICAL - Value extraction"));
    }
}
