//! C3: variation generator — the equivalence class of a surface term.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::normalize::normalize;
use crate::synonyms::SynonymStore;

const PREFIXES: &[&str] = &[
    "history of ",
    "chronic ",
    "acute ",
    "suspected ",
    "possible ",
    "recurrent ",
];

/// Word → alternative words (disease↔disorder↔syndrome, drug↔medication, ...).
pub static COMMON_REPLACEMENTS: LazyLock<HashMap<&'static str, Vec<&'static str>>> =
    LazyLock::new(|| {
        [
            ("disease", vec!["disorder", "syndrome"]),
            ("disorder", vec!["disease", "syndrome"]),
            ("syndrome", vec!["disease", "disorder"]),
            ("drug", vec!["medication", "medicine"]),
            ("medication", vec!["drug", "medicine"]),
            ("medicine", vec!["drug", "medication"]),
            ("high", vec!["elevated", "increased"]),
            ("elevated", vec!["high", "increased"]),
            ("low", vec!["decreased", "reduced"]),
            ("decreased", vec!["low", "reduced"]),
            ("heart", vec!["cardiac"]),
            ("cardiac", vec!["heart"]),
            ("kidney", vec!["renal"]),
            ("renal", vec!["kidney"]),
            ("lung", vec!["pulmonary"]),
            ("pulmonary", vec!["lung"]),
        ]
        .into_iter()
        .collect()
    });

/// Uppercase abbreviation → lowercase expansions. Expansion → abbreviation
/// is derived (emitted bidirectionally) rather than duplicated here.
pub static ABBREVIATIONS: LazyLock<HashMap<&'static str, Vec<&'static str>>> = LazyLock::new(|| {
    [
        ("MI", vec!["myocardial infarction"]),
        ("HTN", vec!["hypertension"]),
        ("DM", vec!["diabetes mellitus"]),
        ("COPD", vec!["chronic obstructive pulmonary disease"]),
        ("CHF", vec!["congestive heart failure"]),
        ("CAD", vec!["coronary artery disease"]),
        ("CVA", vec!["cerebrovascular accident", "stroke"]),
        ("UTI", vec!["urinary tract infection"]),
        ("GERD", vec!["gastroesophageal reflux disease"]),
        ("RA", vec!["rheumatoid arthritis"]),
        ("OA", vec!["osteoarthritis"]),
        ("CKD", vec!["chronic kidney disease"]),
        ("HLD", vec!["hyperlipidemia"]),
        ("BPH", vec!["benign prostatic hyperplasia"]),
        ("DVT", vec!["deep vein thrombosis"]),
        ("PE", vec!["pulmonary embolism"]),
        ("ADHD", vec!["attention deficit hyperactivity disorder"]),
        ("IBD", vec!["inflammatory bowel disease"]),
        ("IBS", vec!["irritable bowel syndrome"]),
        ("HA", vec!["headache"]),
        ("SOB", vec!["shortness of breath"]),
        ("CP", vec!["chest pain"]),
        ("BP", vec!["blood pressure"]),
        ("Hb A1c", vec!["hemoglobin a1c"]),
    ]
    .into_iter()
    .collect()
});

static EXPANSION_TO_ABBREVIATION: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        let mut map = HashMap::new();
        for (abbrev, expansions) in ABBREVIATIONS.iter() {
            for expansion in expansions {
                map.insert(*expansion, *abbrev);
            }
        }
        map
    });

/// Suffix → meaning, rewritten as `t[:-len(suffix)] + " " + meaning`.
pub static MEDICAL_SUFFIXES: LazyLock<Vec<(&'static str, &'static str)>> = LazyLock::new(|| {
    vec![
        ("itis", "inflammation"),
        ("emia", "blood condition"),
        ("oma", "tumor"),
        ("osis", "condition"),
        ("pathy", "disease"),
        ("megaly", "enlargement"),
        ("algia", "pain"),
        ("dynia", "pain"),
        ("ectomy", "surgical removal"),
        ("plasty", "surgical repair"),
        ("otomy", "surgical incision"),
        ("ostomy", "surgical opening"),
        ("scopy", "visual examination"),
        ("graphy", "imaging"),
        ("gram", "record"),
        ("trophy", "growth"),
    ]
});

/// Emits the deduplicated equivalence class of a normalized term *t*,
/// always including *t* itself. Deterministic for a given `SynonymStore` snapshot.
pub fn variations(term: &str, synonyms: &SynonymStore) -> HashSet<String> {
    let t = normalize(term);
    let mut out = HashSet::new();
    if t.is_empty() {
        return out;
    }
    out.insert(t.clone());

    // 1. Prefix trim
    for prefix in PREFIXES {
        if let Some(stripped) = t.strip_prefix(prefix) {
            push(&mut out, stripped);
        }
    }

    // 2 & 3. Punctuation removal / whitespace collapse: `normalize` already
    // performs both, so re-normalizing is a no-op; nothing to add beyond `t`.

    // 4. Abbreviation expansion, bidirectional.
    let upper = t.to_uppercase();
    if let Some(expansions) = ABBREVIATIONS.get(upper.as_str()) {
        for expansion in expansions {
            push(&mut out, expansion);
        }
    }
    if let Some(abbrev) = EXPANSION_TO_ABBREVIATION.get(t.as_str()) {
        push(&mut out, &abbrev.to_lowercase());
    }

    // 5. Word-level synonym swap, single-word only, no compounding per emission.
    let words: Vec<&str> = t.split_whitespace().collect();
    for (idx, word) in words.iter().enumerate() {
        if let Some(alternatives) = COMMON_REPLACEMENTS.get(word) {
            for alt in alternatives {
                let mut swapped = words.clone();
                swapped[idx] = alt;
                push(&mut out, &swapped.join(" "));
            }
        }
    }

    // 6. Suffix rewrite.
    for (suffix, meaning) in MEDICAL_SUFFIXES.iter() {
        if let Some(stem) = t.strip_suffix(suffix) {
            if !stem.is_empty() {
                push(&mut out, &format!("{stem} {meaning}"));
            }
        }
    }

    // 7. Synonym cluster.
    for member in synonyms.cluster_members(&t) {
        push(&mut out, &member);
    }

    out
}

fn push(out: &mut HashSet<String>, candidate: &str) {
    let normalized = normalize(candidate);
    if !normalized.is_empty() {
        out.insert(normalized);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_contains_normalized_input() {
        let store = SynonymStore::empty();
        let variants = variations("Chronic Kidney Disease", &store);
        assert!(variants.contains("chronic kidney disease"));
    }

    #[test]
    fn prefix_trim_emits_stripped_form() {
        let store = SynonymStore::empty();
        let variants = variations("history of myocardial infarction", &store);
        assert!(variants.contains("myocardial infarction"));
    }

    #[test]
    fn abbreviation_expands_bidirectionally() {
        let store = SynonymStore::empty();
        let from_abbrev = variations("MI", &store);
        assert!(from_abbrev.contains("myocardial infarction"));

        let from_expansion = variations("myocardial infarction", &store);
        assert!(from_expansion.contains("mi"));
    }

    #[test]
    fn suffix_rewrite_applies() {
        let store = SynonymStore::empty();
        let variants = variations("arthritis", &store);
        assert!(variants.contains("arthr inflammation"));
    }

    #[test]
    fn all_variations_are_normalized() {
        let store = SynonymStore::empty();
        for v in variations("History of Type-2 Diabetes", &store) {
            assert_eq!(normalize(&v), v);
        }
    }
}
