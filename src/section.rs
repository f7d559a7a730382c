//! The closed set of review sections.
//!
//! Every structured review maps a fixed set of [`Section`]s to summary text.
//! The set is an enum rather than free-form strings so the export schema is
//! known at compile time and each section carries its own prompt instruction
//! (see [`crate::prompts::section_instruction`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One category of a structured systematic review.
///
/// The serialised name is the export label (`"Abstract"`, `"Methods"`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Section {
    Abstract,
    Methods,
    Results,
    #[serde(rename = "Research Question")]
    ResearchQuestion,
    #[serde(rename = "Search Strategy")]
    SearchStrategy,
    #[serde(rename = "Inclusion Criteria")]
    InclusionCriteria,
    #[serde(rename = "Exclusion Criteria")]
    ExclusionCriteria,
    #[serde(rename = "Data Extraction")]
    DataExtraction,
    #[serde(rename = "Data Synthesis")]
    DataSynthesis,
}

impl Section {
    /// The default review schema.
    pub const CORE: [Section; 3] = [Section::Abstract, Section::Methods, Section::Results];

    /// Core schema plus the systematic-review method details.
    pub const ALL: [Section; 9] = [
        Section::Abstract,
        Section::Methods,
        Section::Results,
        Section::ResearchQuestion,
        Section::SearchStrategy,
        Section::InclusionCriteria,
        Section::ExclusionCriteria,
        Section::DataExtraction,
        Section::DataSynthesis,
    ];

    /// Stable label used as the JSON key.
    pub fn label(self) -> &'static str {
        match self {
            Section::Abstract => "Abstract",
            Section::Methods => "Methods",
            Section::Results => "Results",
            Section::ResearchQuestion => "Research Question",
            Section::SearchStrategy => "Search Strategy",
            Section::InclusionCriteria => "Inclusion Criteria",
            Section::ExclusionCriteria => "Exclusion Criteria",
            Section::DataExtraction => "Data Extraction",
            Section::DataSynthesis => "Data Synthesis",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Section {
    type Err = String;

    /// Accepts the export label or a compact form, case-insensitively:
    /// `"Research Question"`, `"research-question"`, `"research_question"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        Section::ALL
            .into_iter()
            .find(|section| {
                section
                    .label()
                    .chars()
                    .filter(|c| *c != ' ')
                    .flat_map(char::to_lowercase)
                    .eq(key.chars())
            })
            .ok_or_else(|| format!("unknown section '{}'", s.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_unique() {
        let mut labels: Vec<&str> = Section::ALL.iter().map(|s| s.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), Section::ALL.len());
    }

    #[test]
    fn serde_name_matches_label() {
        for section in Section::ALL {
            let json = serde_json::to_string(&section).unwrap();
            assert_eq!(json, format!("\"{}\"", section.label()));
        }
    }

    #[test]
    fn parse_accepts_label_and_compact_forms() {
        assert_eq!("Abstract".parse::<Section>().unwrap(), Section::Abstract);
        assert_eq!("results".parse::<Section>().unwrap(), Section::Results);
        assert_eq!(
            "research-question".parse::<Section>().unwrap(),
            Section::ResearchQuestion
        );
        assert_eq!(
            "Data Synthesis".parse::<Section>().unwrap(),
            Section::DataSynthesis
        );
        assert!("discussion".parse::<Section>().is_err());
    }

    #[test]
    fn core_is_prefix_of_all() {
        assert_eq!(&Section::ALL[..3], &Section::CORE[..]);
    }
}
