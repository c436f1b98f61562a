//! Urgency rule tables
//!
//! Codes are stored normalised: uppercase with the dot removed, so `R06.0`
//! is written `R060`. Specific rules match by longest prefix. Chapter rules
//! cover whatever the specific rules miss.

use super::Urgency::{self, High, Low, Medium};

pub(super) const CARDIOLOGY: &str = "Cardiology";
pub(super) const DERMATOLOGY: &str = "Dermatology";
pub(super) const EMERGENCY: &str = "Emergency Medicine";
pub(super) const ENDOCRINOLOGY: &str = "Endocrinology";
pub(super) const GASTROENTEROLOGY: &str = "Gastroenterology";
pub(super) const GENERAL_PRACTICE: &str = "General Practice";
pub(super) const GENERAL_SURGERY: &str = "General Surgery";
pub(super) const GENETICS: &str = "Medical Genetics";
pub(super) const HEMATOLOGY: &str = "Hematology";
pub(super) const INFECTIOUS_DISEASE: &str = "Infectious Disease";
pub(super) const NEONATOLOGY: &str = "Neonatology";
pub(super) const NEUROLOGY: &str = "Neurology";
pub(super) const OBSTETRICS: &str = "Obstetrics";
pub(super) const ONCOLOGY: &str = "Oncology";
pub(super) const OPHTHALMOLOGY: &str = "Ophthalmology";
pub(super) const ORTHOPEDICS: &str = "Orthopedics";
pub(super) const OTOLARYNGOLOGY: &str = "Otolaryngology";
pub(super) const PSYCHIATRY: &str = "Psychiatry";
pub(super) const PULMONOLOGY: &str = "Pulmonology";
pub(super) const UROLOGY: &str = "Urology";

#[derive(Debug, Clone, Copy)]
pub(super) struct CodeRule {
    pub prefix: &'static str,
    pub urgency: Urgency,
    pub specialty: &'static str,
    pub label: &'static str,
}

const fn code(
    prefix: &'static str,
    urgency: Urgency,
    specialty: &'static str,
    label: &'static str,
) -> CodeRule {
    CodeRule {
        prefix,
        urgency,
        specialty,
        label,
    }
}

#[rustfmt::skip]
pub(super) const CODE_RULES: &[CodeRule] = &[
    // Circulatory
    code("I10", Low, CARDIOLOGY, "essential hypertension"),
    code("I16", High, CARDIOLOGY, "hypertensive crisis"),
    code("I20", Medium, CARDIOLOGY, "angina pectoris"),
    code("I21", High, CARDIOLOGY, "acute myocardial infarction"),
    code("I22", High, CARDIOLOGY, "subsequent myocardial infarction"),
    code("I24", High, CARDIOLOGY, "acute ischaemic heart disease"),
    code("I26", High, PULMONOLOGY, "pulmonary embolism"),
    code("I46", High, CARDIOLOGY, "cardiac arrest"),
    code("I490", High, CARDIOLOGY, "ventricular fibrillation and flutter"),
    code("I60", High, NEUROLOGY, "subarachnoid haemorrhage"),
    code("I61", High, NEUROLOGY, "intracerebral haemorrhage"),
    code("I62", High, NEUROLOGY, "intracranial haemorrhage"),
    code("I63", High, NEUROLOGY, "cerebral infarction"),
    code("I64", High, NEUROLOGY, "stroke"),
    code("I71", High, GENERAL_SURGERY, "aortic aneurysm and dissection"),
    // Respiratory
    code("J00", Low, GENERAL_PRACTICE, "common cold"),
    code("J02", Low, GENERAL_PRACTICE, "acute pharyngitis"),
    code("J18", Medium, PULMONOLOGY, "pneumonia"),
    code("J45", Medium, PULMONOLOGY, "asthma"),
    code("J46", High, PULMONOLOGY, "status asthmaticus"),
    code("J96", High, PULMONOLOGY, "respiratory failure"),
    // Nervous system
    code("G40", Medium, NEUROLOGY, "epilepsy"),
    code("G41", High, NEUROLOGY, "status epilepticus"),
    code("G43", Low, NEUROLOGY, "migraine"),
    code("G45", High, NEUROLOGY, "transient ischaemic attack"),
    // Endocrine
    code("E101", High, ENDOCRINOLOGY, "type 1 diabetes with ketoacidosis"),
    code("E111", High, ENDOCRINOLOGY, "type 2 diabetes with ketoacidosis"),
    code("E162", Medium, ENDOCRINOLOGY, "hypoglycaemia"),
    // Mental health
    code("F32", Medium, PSYCHIATRY, "depressive episode"),
    code("F41", Low, PSYCHIATRY, "anxiety disorder"),
    // Digestive
    code("K35", High, GENERAL_SURGERY, "acute appendicitis"),
    code("K922", High, GASTROENTEROLOGY, "gastrointestinal haemorrhage"),
    // Symptoms and signs
    code("R04", Medium, OTOLARYNGOLOGY, "haemorrhage from respiratory passages"),
    code("R05", Low, GENERAL_PRACTICE, "cough"),
    code("R06", Medium, PULMONOLOGY, "abnormality of breathing"),
    code("R060", High, PULMONOLOGY, "dyspnoea"),
    code("R07", High, CARDIOLOGY, "chest pain"),
    code("R070", Low, OTOLARYNGOLOGY, "pain in throat"),
    code("R10", Medium, GASTROENTEROLOGY, "abdominal pain"),
    code("R100", High, GENERAL_SURGERY, "acute abdomen"),
    code("R11", Low, GASTROENTEROLOGY, "nausea and vomiting"),
    code("R21", Low, DERMATOLOGY, "rash"),
    code("R31", Medium, UROLOGY, "haematuria"),
    code("R40", High, NEUROLOGY, "altered level of consciousness"),
    code("R42", Low, GENERAL_PRACTICE, "dizziness"),
    code("R4585", High, PSYCHIATRY, "suicidal or homicidal ideation"),
    code("R50", Medium, GENERAL_PRACTICE, "fever"),
    code("R51", Low, NEUROLOGY, "headache"),
    code("R53", Low, GENERAL_PRACTICE, "malaise and fatigue"),
    code("R55", Medium, CARDIOLOGY, "syncope"),
    code("R56", High, NEUROLOGY, "convulsions"),
    code("R57", High, EMERGENCY, "shock"),
    code("R58", High, EMERGENCY, "haemorrhage"),
    // Injury and poisoning
    code("S06", High, NEUROLOGY, "intracranial injury"),
    code("T14", Medium, EMERGENCY, "injury of unspecified body region"),
    code("T1491", High, PSYCHIATRY, "suicide attempt"),
    code("T39", High, EMERGENCY, "analgesic poisoning"),
    code("T40", High, EMERGENCY, "narcotic poisoning"),
    code("T71", High, EMERGENCY, "asphyxiation"),
    code("T782", High, EMERGENCY, "anaphylactic shock"),
];

/// A block of ICD-10 categories, inclusive on both ends
#[derive(Debug, Clone, Copy)]
pub(super) struct ChapterRule {
    pub from: (char, u8),
    pub to: (char, u8),
    pub urgency: Urgency,
    pub specialty: &'static str,
    pub label: &'static str,
}

const fn chapter(
    from: (char, u8),
    to: (char, u8),
    urgency: Urgency,
    specialty: &'static str,
    label: &'static str,
) -> ChapterRule {
    ChapterRule {
        from,
        to,
        urgency,
        specialty,
        label,
    }
}

#[rustfmt::skip]
pub(super) const CHAPTER_RULES: &[ChapterRule] = &[
    chapter(('A', 0), ('B', 99), Medium, INFECTIOUS_DISEASE, "infectious and parasitic diseases"),
    chapter(('C', 0), ('D', 49), Medium, ONCOLOGY, "neoplasms"),
    chapter(('D', 50), ('D', 89), Medium, HEMATOLOGY, "blood and immune disorders"),
    chapter(('E', 0), ('E', 99), Low, ENDOCRINOLOGY, "endocrine and metabolic diseases"),
    chapter(('F', 0), ('F', 99), Medium, PSYCHIATRY, "mental and behavioural disorders"),
    chapter(('G', 0), ('G', 99), Medium, NEUROLOGY, "diseases of the nervous system"),
    chapter(('H', 0), ('H', 59), Low, OPHTHALMOLOGY, "diseases of the eye"),
    chapter(('H', 60), ('H', 99), Low, OTOLARYNGOLOGY, "diseases of the ear"),
    chapter(('I', 0), ('I', 99), Medium, CARDIOLOGY, "diseases of the circulatory system"),
    chapter(('J', 0), ('J', 99), Low, PULMONOLOGY, "diseases of the respiratory system"),
    chapter(('K', 0), ('K', 99), Low, GASTROENTEROLOGY, "diseases of the digestive system"),
    chapter(('L', 0), ('L', 99), Low, DERMATOLOGY, "diseases of the skin"),
    chapter(('M', 0), ('M', 99), Low, ORTHOPEDICS, "musculoskeletal disorders"),
    chapter(('N', 0), ('N', 99), Low, UROLOGY, "genitourinary disorders"),
    chapter(('O', 0), ('O', 99), High, OBSTETRICS, "pregnancy and childbirth"),
    chapter(('P', 0), ('P', 99), High, NEONATOLOGY, "perinatal conditions"),
    chapter(('Q', 0), ('Q', 99), Low, GENETICS, "congenital malformations"),
    chapter(('R', 0), ('R', 99), Low, GENERAL_PRACTICE, "symptoms and signs"),
    chapter(('S', 0), ('T', 99), Medium, EMERGENCY, "injury and poisoning"),
    chapter(('U', 0), ('U', 99), Medium, INFECTIOUS_DISEASE, "codes for special purposes"),
    chapter(('V', 0), ('Y', 99), Medium, EMERGENCY, "external causes"),
    chapter(('Z', 0), ('Z', 99), Low, GENERAL_PRACTICE, "health status and services"),
];

/// Free-text phrases mapped onto a specific code rule
#[rustfmt::skip]
pub(super) const KEYWORDS: &[(&str, &str)] = &[
    ("chest pain", "R07"),
    ("chest tightness", "R07"),
    ("heart attack", "I21"),
    ("shortness of breath", "R060"),
    ("difficulty breathing", "R060"),
    ("breathlessness", "R060"),
    ("wheezing", "R06"),
    ("stroke", "I64"),
    ("slurred speech", "I64"),
    ("facial droop", "I64"),
    ("seizure", "R56"),
    ("convulsion", "R56"),
    ("unconscious", "R40"),
    ("unresponsive", "R40"),
    ("fainting", "R55"),
    ("fainted", "R55"),
    ("syncope", "R55"),
    ("anaphylaxis", "T782"),
    ("allergic reaction", "T782"),
    ("haemorrhage", "R58"),
    ("hemorrhage", "R58"),
    ("heavy bleeding", "R58"),
    ("coughing blood", "R04"),
    ("blood in urine", "R31"),
    ("suicidal", "R4585"),
    ("overdose", "T40"),
    ("abdominal pain", "R10"),
    ("stomach pain", "R10"),
    ("stomach ache", "R10"),
    ("nausea", "R11"),
    ("vomiting", "R11"),
    ("fever", "R50"),
    ("headache", "R51"),
    ("migraine", "G43"),
    ("sore throat", "R070"),
    ("cough", "R05"),
    ("runny nose", "J00"),
    ("dizziness", "R42"),
    ("dizzy", "R42"),
    ("fatigue", "R53"),
    ("tiredness", "R53"),
    ("rash", "R21"),
    ("anxiety", "F41"),
    ("depression", "F32"),
];

/// Longest specific rule whose prefix starts `code`
pub(super) fn match_code(code: &str) -> Option<&'static CodeRule> {
    CODE_RULES
        .iter()
        .filter(|rule| code.starts_with(rule.prefix))
        .max_by_key(|rule| rule.prefix.len())
}

pub(super) fn match_chapter(code: &str) -> Option<&'static ChapterRule> {
    let category = category_of(code)?;
    CHAPTER_RULES
        .iter()
        .find(|rule| rule.from <= category && category <= rule.to)
}

/// Longest phrase contained in the lowercased symptom name
pub(super) fn match_keyword(name: &str) -> Option<(&'static str, &'static CodeRule)> {
    let name = name.to_lowercase();
    KEYWORDS
        .iter()
        .filter(|(phrase, _)| name.contains(phrase))
        .max_by_key(|(phrase, _)| phrase.len())
        .and_then(|(phrase, code)| match_code(code).map(|rule| (*phrase, rule)))
}

/// `(letter, two-digit category)`; a letter in the third position (as in
/// `O9A`) sorts after every digit of that decade
fn category_of(code: &str) -> Option<(char, u8)> {
    let mut chars = code.chars();
    let letter = chars.next()?;
    let tens = chars.next()?.to_digit(10)? as u8;
    let ones = match chars.next()? {
        c if c.is_ascii_digit() => c as u8 - b'0',
        c if c.is_ascii_alphabetic() => 9,
        _ => return None,
    };
    Some((letter, tens * 10 + ones))
}
