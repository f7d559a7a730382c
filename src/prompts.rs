//! Prompts for section-targeted summarisation.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: changing what the model is asked for a
//!    section requires editing exactly one place.
//!
//! 2. **Testability**: unit tests can inspect prompts directly without
//!    calling a model, so prompt regressions are easy to catch.
//!
//! Callers can override the system prompt via
//! [`crate::config::ReviewConfig::system_prompt`]; the per-section
//! instructions are part of the closed [`Section`] schema and are not
//! configurable.

use crate::section::Section;

/// Default system prompt sent ahead of every summarisation request.
///
/// Used when `ReviewConfig::system_prompt` is `None`.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert research assistant preparing a systematic review. You receive an instruction followed by an excerpt of a research paper.

Follow these rules precisely:

1. FAITHFULNESS
   - Use ONLY information present in the excerpt
   - Do not speculate or add outside knowledge
   - If the excerpt contains nothing relevant to the instruction, answer with an empty response

2. STYLE
   - Write plain prose in complete sentences
   - Be concise: at most a few sentences
   - Keep numbers, units, and named entities exactly as written

3. OUTPUT FORMAT
   - Output ONLY the summary text
   - Do NOT use Markdown headings, lists, or code fences
   - Do NOT add commentary, preambles, or explanations"#;

/// Instruction describing what a section should capture.
pub fn section_instruction(section: Section) -> &'static str {
    match section {
        Section::Abstract => {
            "Provide a concise and clear summary of the document's key focus and purpose."
        }
        Section::Methods => {
            "Summarize the research methods described in the following text: study design, participants or data, procedures, and analysis."
        }
        Section::Results => "Summarize the primary findings and results described in the following text.",
        Section::ResearchQuestion => {
            "What is the primary research question explicitly stated in the document?"
        }
        Section::SearchStrategy => {
            "Summarize the methods used to identify and select studies, such as databases searched and keywords."
        }
        Section::InclusionCriteria => {
            "List the specific criteria used to include studies in this review."
        }
        Section::ExclusionCriteria => {
            "List the specific criteria used to exclude studies from this review."
        }
        Section::DataExtraction => {
            "Describe the process and tools used for extracting data in this research."
        }
        Section::DataSynthesis => {
            "Explain the approach and methods used to synthesize the data extracted."
        }
    }
}

/// Build the prompt for one chunk of one section: the instruction, a newline,
/// then the chunk text.
pub fn section_prompt(section: Section, chunk_text: &str) -> String {
    format!("{}\n{}", section_instruction(section), chunk_text.trim())
}
