//! Eviction-defense prompt: photos/video of a defect, optional lease text.

/// Lease excerpts longer than this are cut before prompting.
pub const LEASE_EXCERPT_CHARS: usize = 20_000;

const NO_LEASE: &str = "No lease provided. Rely on default state law.";

fn lease_section(lease_text: Option<&str>) -> String {
    match lease_text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(text) => {
            let excerpt: String = text.chars().take(LEASE_EXCERPT_CHARS).collect();
            format!("LEASE TEXT EXCERPT: {excerpt}...")
        }
        None => NO_LEASE.to_string(),
    }
}

pub fn build_evidence_prompt(context: Option<&str>, lease_text: Option<&str>) -> String {
    let context = context
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| format!("User context: {c}"))
        .unwrap_or_default();
    let lease = lease_section(lease_text);

    format!(
        r#"You are a Forensic Housing Investigator and Legal Advocate.

TASK:
1. Analyze the provided image(s)/video(s) of rental property damage.
2. Identify the specific issue (scientific name if mold, technical term if structural).
3. Cite relevant Texas Property Code (Chapter 92) or general Tenant-Landlord law regarding this specific issue. https://statutes.capitol.texas.gov/Docs/PR/htm/PR.92.htm
4. If lease text is provided, cross-reference it. Does the lease incorrectly try to shift responsibility to the tenant? (e.g. "Tenant maintains AC" vs Law "Landlord must fix if hazardous").
5. Assess if this condition constitutes a "condition materially affecting the physical health or safety of an ordinary tenant" (Texas Prop Code 92.056).

CONTEXT:
{context}
{lease}

OUTPUT JSON:
{{
  "diagnosis": {{
    "issue": "Short title of issue",
    "scientificName": "Scientific name or technical description",
    "severity": "Emergency | Urgent | Routine",
    "description": "Detailed visual analysis"
  }},
  "legalAnalysis": {{
    "code": "Specific Legal Code Citation (e.g. Texas Prop Code § 92.052)",
    "requirement": "What the law requires the landlord to do",
    "violation": "Yes/No/Likely",
    "explanation": "Why this is a violation based on the visual evidence"
  }},
  "leaseCrossReference": {{
    "relevantClause": "Clause from lease or 'Not found'",
    "conflict": "Description of conflict between lease and law"
  }},
  "actionPlan": {{
    "steps": ["Step 1", "Step 2"],
    "letterDraft": "Draft a formal 'Notice of Condition' email to the landlord citing the specific code and attaching the evidence."
  }}
}}"#
    )
}
