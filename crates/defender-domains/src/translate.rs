use serde_json::Value;

pub const DEFAULT_LANGUAGE: &str = "Spanish";

/// Map a `?lang=` code to the language name used in the prompt.
/// Unknown or missing codes translate to Spanish.
pub fn language_name(code: Option<&str>) -> &'static str {
    let code = code.map(|c| c.trim().to_lowercase()).unwrap_or_default();
    match code.split(['-', '_']).next().unwrap_or("") {
        "en" => "English",
        "fr" => "French",
        "pt" => "Portuguese",
        "de" => "German",
        "vi" => "Vietnamese",
        "zh" => "Chinese",
        "ko" => "Korean",
        "ar" => "Arabic",
        _ => DEFAULT_LANGUAGE,
    }
}

pub fn build_translation_prompt(analysis: &Value, language: &str) -> String {
    format!(
        r#"Translate this contract analysis to {language}. Return ONLY valid JSON with the EXACT same structure as the input.
- riskScore: translate "grade" and breakdown "category", "status" only; keep "overall", "score", "grade" (letter) as-is.
- comparison: translate "location"; in metrics translate "label", "yourValue" (if it's text like "12 months"), "marketAvg" (if text), "difference", "status", "suggestion". Keep dollar amounts and numbers unchanged (e.g. $1,850, +7.6%).
- summary: translate each string; keep dollar amounts and numbers unchanged.
- risks: translate "title", "description", "standard", "savings", "script"; keep "severity" as "high"/"medium"/"low" and "legalCode" unchanged (e.g. Texas Property Code §92.019).
- totalSavings: translate but keep dollar amounts and numbers.

Return the full object with the same keys and structure. No extra keys.

INPUT JSON:
{analysis}"#
    )
}
