//! Instruction strings synthesized from user actions.
//!
//! Every builder here produces ordinary turn text; the console submits it like typed input.

use crate::syllabus::{SourcePrimary, SourceSecondary};

/// Prompts offered on an empty session.
pub const SUGGESTED_INQUIRIES: [&str; 4] = [
    "What is the definition of Saṃśaya in Nyāya Sūtra?",
    "How does Dharmakīrti critique the Nyāya view of Doubt?",
    "Compare 'Vicikitsā' in Buddhism with 'Saṃśaya' in Nyāya.",
    "Explain the role of 'Tarka' in resolving doubt.",
];

pub fn translate(text: &str) -> String {
    format!(
        "Please translate the following text to Bengali (or Sanskrit if appropriate): \"{}\"",
        text
    )
}

pub fn analyze_primary(source: &SourcePrimary) -> String {
    let section = source
        .section
        .as_deref()
        .map(|s| format!(" section {}", s))
        .unwrap_or_default();
    format!(
        "Analyze the text \"{}\"{}, specifically focusing on {}.",
        source.text,
        section,
        source.concept_focus.as_deref().unwrap_or_default()
    )
}

pub fn explain_bengali_primary(source: &SourcePrimary) -> String {
    format!(
        "Explain the significance of \"{}\" by {} in the context of Nyāya philosophy.",
        source.text,
        source.author.as_deref().unwrap_or_default()
    )
}

pub fn summarize_secondary(source: &SourceSecondary) -> String {
    format!(
        "Please summarize {}'s contributions to the topic of '{}', citing relevant works.",
        source.author, source.focus
    )
}

pub fn define_term(term: &str) -> String {
    format!(
        "Define the term \"{}\" within the context of Indian Epistemology.",
        term
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syllabus::syllabus;

    #[test]
    fn primary_query_includes_section_when_present() {
        let data = syllabus();
        assert_eq!(
            analyze_primary(&data.primary_sources_en[0]),
            "Analyze the text \"Nyāya Sūtra\" section 1.1.23–30, specifically focusing on saṃśaya definition, conflicting characteristics."
        );
        assert_eq!(
            analyze_primary(&data.primary_sources_en[2]),
            "Analyze the text \"Abhidharma-kośa\", specifically focusing on vicikitsā as unwholesome mental factor."
        );
    }

    #[test]
    fn secondary_and_term_queries() {
        let data = syllabus();
        assert_eq!(
            summarize_secondary(&data.secondary_sources[1]),
            "Please summarize J.N. Mohanty's contributions to the topic of 'Epistemology in Indian Philosophy', citing relevant works."
        );
        assert_eq!(
            define_term("Tarka"),
            "Define the term \"Tarka\" within the context of Indian Epistemology."
        );
    }

    #[test]
    fn translate_quotes_target_text() {
        assert_eq!(
            translate("doubt"),
            "Please translate the following text to Bengali (or Sanskrit if appropriate): \"doubt\""
        );
    }

    #[test]
    fn bengali_query_names_author() {
        let data = syllabus();
        let q = explain_bengali_primary(&data.primary_sources_bn[2]);
        assert!(q.starts_with("Explain the significance of \"দিগনাগ"));
        assert!(q.contains("by দিগনাগ in the context of Nyāya philosophy."));
    }
}
