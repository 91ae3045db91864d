//! Analyzed-document data model.
//!
//! These types mirror the JSON produced by the external document analyzer,
//! field names included. The engine treats a loaded `Document` as read-only:
//! aggregates are trusted as given and never recomputed here.

use serde::{Deserialize, Serialize};

/// Nominal answer time assigned to a question when the analyzer omits it.
pub const DEFAULT_ANSWER_SECONDS: u32 = 35;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Image,
    Scripture,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    #[serde(default = "default_answer_time")]
    pub answer_time: u32,
    #[serde(default)]
    pub is_final_question: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parenthesis_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
}

fn default_answer_time() -> u32 {
    DEFAULT_ANSWER_SECONDS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paragraph {
    /// 1-based position in delivery order; unique and increasing.
    pub number: u32,
    pub text: String,
    pub word_count: u32,
    /// Nominal reading time, before any scaling.
    pub reading_time_seconds: u32,
    /// Nominal reading time plus the nominal time of this paragraph's questions.
    pub total_time_seconds: u32,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Paragraph {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn question_seconds(&self) -> i64 {
        self.questions.iter().map(|q| q.answer_time as i64).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub paragraphs: Vec<Paragraph>,
    /// Review questions delivered after the last paragraph.
    #[serde(default)]
    pub final_questions: Vec<Question>,
    #[serde(default)]
    pub total_paragraphs: u32,
    #[serde(default)]
    pub total_words: u32,
    #[serde(default)]
    pub total_questions: u32,
    #[serde(default)]
    pub total_reading_time_seconds: u32,
    #[serde(default)]
    pub total_question_time_seconds: u32,
    #[serde(default)]
    pub total_time_seconds: u32,
    /// Offset of the review block within the nominal timeline, as computed by
    /// the analyzer.
    #[serde(default)]
    pub final_questions_start_time: u32,
}

impl Document {
    pub fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn final_question_count(&self) -> usize {
        self.final_questions.len()
    }

    /// Questions embedded in paragraphs from `start_index` to the end, not
    /// counting the review block.
    pub fn paragraph_questions_from(&self, start_index: usize) -> usize {
        self.paragraphs
            .iter()
            .skip(start_index)
            .map(Paragraph::question_count)
            .sum()
    }
}
