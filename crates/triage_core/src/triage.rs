//! Symptom triage
//!
//! Maps reported symptoms onto an urgency level and the specialties best
//! placed to see the patient. Classification is table driven; see
//! [`rules`] for the tables.

mod rules;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::appointment::Symptom;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// One level up, saturating at `High`
    pub fn escalate(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a finding was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchBasis {
    Code,
    Chapter,
    Keyword,
    Unclassified,
}

/// Classification of a single code, before any severity modifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub code: String,
    pub urgency: Urgency,
    pub specialty: &'static str,
    pub label: &'static str,
    pub basis: MatchBasis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TriageFinding {
    /// Normalised code, present only when the submitted code was usable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icd10: Option<String>,
    pub name: String,
    pub urgency: Urgency,
    pub specialty: String,
    pub matched_rule: String,
    pub basis: MatchBasis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TriageAssessment {
    pub urgency: Urgency,
    pub recommended_specialties: Vec<String>,
    pub findings: Vec<TriageFinding>,
    pub assessed_at: DateTime<Utc>,
}

/// Uppercase, strip whitespace and dots, and check the shape
///
/// Returns `None` unless the result is a letter and a digit followed by
/// one to five alphanumerics (`R07`, `R45851`, `O9A1`).
pub fn normalize_icd10(code: &str) -> Option<String> {
    let normalized: String = code
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let bytes = normalized.as_bytes();
    let valid = (3..=7).contains(&bytes.len())
        && bytes[0].is_ascii_uppercase()
        && bytes[1].is_ascii_digit()
        && bytes[2..].iter().all(u8::is_ascii_alphanumeric);
    valid.then_some(normalized)
}

/// Classify one ICD-10 code against the specific and chapter rules
pub fn classify_code(code: &str) -> Option<Classification> {
    let code = normalize_icd10(code)?;
    if let Some(rule) = rules::match_code(&code) {
        return Some(Classification {
            code,
            urgency: rule.urgency,
            specialty: rule.specialty,
            label: rule.label,
            basis: MatchBasis::Code,
        });
    }
    let chapter = rules::match_chapter(&code)?;
    Some(Classification {
        code,
        urgency: chapter.urgency,
        specialty: chapter.specialty,
        label: chapter.label,
        basis: MatchBasis::Chapter,
    })
}

/// Apply a free-text severity to a base urgency
pub fn apply_severity(urgency: Urgency, severity: Option<&str>) -> Urgency {
    let Some(severity) = severity else {
        return urgency;
    };
    match severity.trim().to_lowercase().as_str() {
        "critical" | "life-threatening" | "life threatening" => Urgency::High,
        "severe" => urgency.escalate(),
        _ => urgency,
    }
}

pub fn assess_symptom(symptom: &Symptom) -> TriageFinding {
    let code = symptom.icd10.as_deref().and_then(normalize_icd10);

    let (urgency, specialty, matched_rule, basis) =
        match code.as_deref().and_then(classify_code) {
            Some(found) => (found.urgency, found.specialty, found.label.to_string(), found.basis),
            None => match rules::match_keyword(&symptom.name) {
                Some((phrase, rule)) => (
                    rule.urgency,
                    rule.specialty,
                    format!("{} (matched \"{phrase}\")", rule.label),
                    MatchBasis::Keyword,
                ),
                None => (
                    Urgency::Low,
                    rules::GENERAL_PRACTICE,
                    "unclassified".to_string(),
                    MatchBasis::Unclassified,
                ),
            },
        };

    TriageFinding {
        icd10: code,
        name: symptom.name.clone(),
        urgency: apply_severity(urgency, symptom.severity.as_deref()),
        specialty: specialty.to_string(),
        matched_rule,
        basis,
    }
}

/// Assess a set of symptoms
pub fn assess(symptoms: &[Symptom]) -> TriageAssessment {
    let findings: Vec<TriageFinding> = symptoms.iter().map(assess_symptom).collect();

    let urgency = findings
        .iter()
        .map(|f| f.urgency)
        .max()
        .unwrap_or(Urgency::Low);

    // (specialty, highest urgency, first index)
    let mut ranked: Vec<(&str, Urgency, usize)> = Vec::new();
    for (index, finding) in findings.iter().enumerate() {
        match ranked.iter_mut().find(|entry| entry.0 == finding.specialty) {
            Some(entry) => entry.1 = entry.1.max(finding.urgency),
            None => ranked.push((&finding.specialty, finding.urgency, index)),
        }
    }
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    let mut recommended_specialties: Vec<String> =
        ranked.into_iter().map(|(s, ..)| s.to_string()).collect();
    if recommended_specialties.is_empty() {
        recommended_specialties.push(rules::GENERAL_PRACTICE.to_string());
    }

    tracing::debug!(
        symptoms = symptoms.len(),
        urgency = %urgency,
        "triage assessment"
    );

    TriageAssessment {
        urgency,
        recommended_specialties,
        findings,
        assessed_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_icd10() {
        assert_eq!(normalize_icd10(" r07.9 ").as_deref(), Some("R079"));
        assert_eq!(normalize_icd10("R45.851").as_deref(), Some("R45851"));
        assert_eq!(normalize_icd10("O9A.1").as_deref(), Some("O9A1"));
        assert_eq!(normalize_icd10("R0"), None);
        assert_eq!(normalize_icd10("7R0"), None);
        assert_eq!(normalize_icd10("R07-9"), None);
        assert_eq!(normalize_icd10("R07912345"), None);
        assert_eq!(normalize_icd10(""), None);
    }

    #[test]
    fn test_red_flag_codes() {
        let cases = [
            ("R07.9", Urgency::High, "Cardiology"),
            ("I21.4", Urgency::High, "Cardiology"),
            ("I63.9", Urgency::High, "Neurology"),
            ("R06.02", Urgency::High, "Pulmonology"),
            ("J96.0", Urgency::High, "Pulmonology"),
            ("T78.2", Urgency::High, "Emergency Medicine"),
            ("R56.9", Urgency::High, "Neurology"),
            ("R45.851", Urgency::High, "Psychiatry"),
        ];
        for (code, urgency, specialty) in cases {
            let found = classify_code(code).unwrap();
            assert_eq!((found.urgency, found.specialty), (urgency, specialty), "{code}");
            assert_eq!(found.basis, MatchBasis::Code);
        }
    }

    #[test]
    fn test_chapter_fallback() {
        let found = classify_code("O26.9").unwrap();
        assert_eq!(found.urgency, Urgency::High);
        assert_eq!(found.specialty, "Obstetrics");
        assert_eq!(found.basis, MatchBasis::Chapter);

        let found = classify_code("S52.5").unwrap();
        assert_eq!(found.urgency, Urgency::Medium);
        assert_eq!(found.specialty, "Emergency Medicine");

        let found = classify_code("E78.5").unwrap();
        assert_eq!(found.urgency, Urgency::Low);
        assert_eq!(found.specialty, "Endocrinology");
    }

    #[test]
    fn test_severity_modifiers() {
        assert_eq!(apply_severity(Urgency::Low, Some("severe")), Urgency::Medium);
        assert_eq!(apply_severity(Urgency::Medium, Some(" Severe ")), Urgency::High);
        assert_eq!(apply_severity(Urgency::High, Some("severe")), Urgency::High);
        assert_eq!(apply_severity(Urgency::Low, Some("critical")), Urgency::High);
        assert_eq!(
            apply_severity(Urgency::Low, Some("Life-Threatening")),
            Urgency::High
        );
        assert_eq!(apply_severity(Urgency::Medium, Some("mild")), Urgency::Medium);
        assert_eq!(apply_severity(Urgency::Medium, Some("moderate")), Urgency::Medium);
        assert_eq!(apply_severity(Urgency::Medium, None), Urgency::Medium);
    }

    #[test]
    fn test_empty_input() {
        let assessment = assess(&[]);
        assert_eq!(assessment.urgency, Urgency::Low);
        assert_eq!(assessment.recommended_specialties, vec!["General Practice"]);
        assert!(assessment.findings.is_empty());
    }

    #[test]
    fn test_keyword_match_for_uncoded_symptom() {
        let finding = assess_symptom(&Symptom::named("Crushing chest pain"));
        assert_eq!(finding.urgency, Urgency::High);
        assert_eq!(finding.specialty, "Cardiology");
        assert_eq!(finding.basis, MatchBasis::Keyword);
        assert_eq!(finding.icd10, None);
    }

    #[test]
    fn test_invalid_code_falls_back_to_keyword() {
        let finding = assess_symptom(&Symptom::coded("not-a-code", "seizure"));
        assert_eq!(finding.icd10, None);
        assert_eq!(finding.urgency, Urgency::High);
        assert_eq!(finding.specialty, "Neurology");
    }

    #[test]
    fn test_unmatched_symptom() {
        let finding = assess_symptom(&Symptom::named("itchy elbow").with_severity("severe"));
        assert_eq!(finding.basis, MatchBasis::Unclassified);
        assert_eq!(finding.specialty, "General Practice");
        assert_eq!(finding.urgency, Urgency::Medium);
    }

    #[test]
    fn test_assessment_ranks_specialties() {
        let assessment = assess(&[
            Symptom::coded("R51", "headache"),
            Symptom::coded("R11.0", "nausea"),
            Symptom::coded("R07.9", "chest pain"),
            Symptom::coded("G43.9", "migraine").with_severity("severe"),
        ]);

        assert_eq!(assessment.urgency, Urgency::High);
        assert_eq!(
            assessment.recommended_specialties,
            vec!["Cardiology", "Neurology", "Gastroenterology"]
        );
        assert_eq!(assessment.findings.len(), 4);
        assert_eq!(assessment.findings[3].urgency, Urgency::Medium);
    }

    #[test]
    fn test_urgency_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Urgency::Medium).unwrap(), "\"medium\"");
        assert!(Urgency::High > Urgency::Medium && Urgency::Medium > Urgency::Low);
    }
}
