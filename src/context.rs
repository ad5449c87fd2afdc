//! C6: context adjuster — keyword/cue co-occurrence score boost.

use std::sync::LazyLock;

use crate::vocabulary::Vocabulary;

/// Per-vocabulary keyword -> contextual cue strings (spec.md §4.6).
pub static SNOMED_CONTEXT: LazyLock<Vec<(&'static str, Vec<&'static str>)>> = LazyLock::new(|| {
    vec![
        ("diabetes", vec!["glucose", "sugar", "a1c", "metformin", "insulin", "glycemic"]),
        ("hypertension", vec!["blood pressure", "bp", "systolic", "diastolic", "mmhg"]),
        ("asthma", vec!["respiratory", "breathing", "wheeze", "inhaler", "bronchial"]),
        ("pneumonia", vec!["lung", "respiratory", "cough", "infection", "fever"]),
        ("heart", vec!["cardiac", "chest pain", "cardiovascular", "ecg", "ekg"]),
    ]
});

pub static LOINC_CONTEXT: LazyLock<Vec<(&'static str, Vec<&'static str>)>> = LazyLock::new(|| {
    vec![
        ("hemoglobin", vec!["blood", "cbc", "anemia", "diabetes"]),
        ("glucose", vec!["diabetes", "blood sugar", "fasting", "a1c"]),
        ("cholesterol", vec!["lipid", "hdl", "ldl", "cardiovascular"]),
        ("creatinine", vec!["kidney", "renal", "gfr", "bun"]),
    ]
});

pub static RXNORM_CONTEXT: LazyLock<Vec<(&'static str, Vec<&'static str>)>> = LazyLock::new(|| {
    vec![
        ("metformin", vec!["diabetes", "hypoglycemic", "glucose", "a1c"]),
        ("lisinopril", vec!["hypertension", "blood pressure", "ace inhibitor", "bp"]),
        ("aspirin", vec!["antiplatelet", "pain", "blood thinner", "heart", "stroke"]),
        ("atorvastatin", vec!["cholesterol", "statin", "lipid", "cardiovascular"]),
    ]
});

/// Records which cue fired, so the caller can stamp `context_term`.
pub struct ContextAdjustment {
    pub cue: String,
}

/// First-hit-wins lookup against `vocabulary`'s context table: if `display`
/// contains a keyword and `context` contains one of its cues, returns the
/// cue that fired. At most one firing per match (spec.md §4.6).
pub fn apply(vocabulary: Vocabulary, display: &str, context: &str) -> Option<ContextAdjustment> {
    let display_lower = display.to_lowercase();
    let context_lower = context.to_lowercase();

    let table: &Vec<(&'static str, Vec<&'static str>)> = match vocabulary {
        Vocabulary::Snomed => &SNOMED_CONTEXT,
        Vocabulary::Loinc => &LOINC_CONTEXT,
        Vocabulary::Rxnorm => &RXNORM_CONTEXT,
    };

    for (keyword, cues) in table {
        if !display_lower.contains(keyword) {
            continue;
        }
        for cue in cues {
            if context_lower.contains(cue) {
                return Some(ContextAdjustment { cue: cue.to_string() });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diabetes_display_with_metformin_context_fires() {
        let adjustment = apply(
            Vocabulary::Snomed,
            "Diabetes mellitus type 2",
            "HbA1c elevated, on metformin",
        )
        .unwrap();
        assert_eq!(adjustment.cue, "metformin");
    }

    #[test]
    fn unrelated_context_does_not_fire() {
        assert!(apply(Vocabulary::Snomed, "Diabetes mellitus type 2", "patient reports headache").is_none());
    }

    #[test]
    fn keyword_only_applies_within_its_own_vocabulary() {
        // "metformin" is an RxNorm keyword, not a SNOMED one.
        assert!(apply(Vocabulary::Snomed, "Metformin 500mg", "diabetes, glucose").is_none());
    }
}
