//! The bundled syllabus: the closed body of sources the console answers from.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourcePrimary {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_focus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceSecondary {
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub works: Option<Vec<String>>,
    pub focus: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyllabusData {
    pub project_title: String,
    pub core_concept: String,
    pub primary_sources_en: Vec<SourcePrimary>,
    pub primary_sources_bn: Vec<SourcePrimary>,
    pub secondary_sources: Vec<SourceSecondary>,
    pub key_terms: Vec<String>,
}

static SYLLABUS: Lazy<SyllabusData> = Lazy::new(build_syllabus);

/// The shared syllabus instance.
pub fn syllabus() -> &'static SyllabusData {
    &SYLLABUS
}

fn primary_en(text: &str, section: Option<&str>, focus: &str) -> SourcePrimary {
    SourcePrimary {
        text: text.to_string(),
        section: section.map(str::to_string),
        concept_focus: Some(focus.to_string()),
        author: None,
        language: None,
        note: None,
    }
}

fn primary_bn(text: &str, author: &str, language: &str, note: &str) -> SourcePrimary {
    SourcePrimary {
        text: text.to_string(),
        section: None,
        concept_focus: None,
        author: Some(author.to_string()),
        language: Some(language.to_string()),
        note: Some(note.to_string()),
    }
}

fn secondary(author: &str, works: &[&str], focus: &str, language: Option<&str>) -> SourceSecondary {
    SourceSecondary {
        author: author.to_string(),
        works: if works.is_empty() {
            None
        } else {
            Some(works.iter().map(|w| w.to_string()).collect())
        },
        focus: focus.to_string(),
        language: language.map(str::to_string),
    }
}

fn build_syllabus() -> SyllabusData {
    SyllabusData {
        project_title: "Gemini-Saṃśaya: Nyāya-Buddhist Doubt Research Console".to_string(),
        core_concept: "Saṃśaya (Doubt)".to_string(),
        primary_sources_en: vec![
            primary_en(
                "Nyāya Sūtra",
                Some("1.1.23–30"),
                "saṃśaya definition, conflicting characteristics",
            ),
            primary_en(
                "Pāli Canon: Saṃyutta Nikāya, Dīgha Nikāya, Majjhima Nikāya",
                None,
                "vicikitsā (doubt) as nīvaraṇa (hinderance) and fetter",
            ),
            primary_en(
                "Abhidharma-kośa",
                None,
                "vicikitsā as unwholesome mental factor",
            ),
            primary_en(
                "Pramāṇa-vāda literature: Dignāga, Dharmakīrti",
                None,
                "critical reflection (tarka), doubt as epistemically unproductive",
            ),
        ],
        primary_sources_bn: vec![
            primary_bn(
                "গৌতম — ন্যায়সূত্র (বাংলা অনুবাদ সহ)",
                "গৌতম",
                "Bengali/Sanskrit",
                "Nyāya Sūtra & Translation",
            ),
            primary_bn(
                "বাচস্পতি মিশ্র — ন্যায়বৃত্তি",
                "বাচস্পতি মিশ্র",
                "Bengali/Sanskrit",
                "Nyāya Vṛtti",
            ),
            primary_bn(
                "দিগনাগ — প্রমাণসমুচ্চয় (বাংলা/অনুবাদ)",
                "দিগনাগ",
                "Bengali/Translation",
                "Pramāṇasamuccaya",
            ),
        ],
        secondary_sources: vec![
            secondary(
                "B.K. Matilal",
                &[
                    "Perception: An Essay on Classical Indian Theories of Knowledge",
                    "The Character of Logic in India",
                ],
                "Nyāya vs. Buddhist doubt, pramāṇa, error",
                None,
            ),
            secondary("J.N. Mohanty", &[], "Epistemology in Indian Philosophy", None),
            secondary(
                "Jonardon Ganeri",
                &["Philosophy in Classical India"],
                "Comparative Nyāya–Buddhist analysis",
                None,
            ),
            secondary(
                "শ্রীকুমার সেন",
                &["বৌদ্ধ যুক্তিবিদ্যা"],
                "Buddhist Logic",
                Some("Bengali"),
            ),
        ],
        key_terms: [
            "Saṃśaya",
            "Vicikitsā",
            "Pramāṇa",
            "Tarka",
            "Nīvaraṇa",
            "Saṃśaya-hetus",
        ]
        .iter()
        .map(|t| t.to_string())
        .collect(),
    }
}
