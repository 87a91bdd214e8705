pub mod store;
pub mod validate;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use store::{QuestionLookup, QuestionStats, QuestionStore};
pub use validate::save_section_questions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Multiple,
    Boolean,
    Text,
}

/// An answer value. Which variant is meaningful depends on the question type;
/// mismatched variants are representable and simply never grade as correct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Flag(bool),
    Choice(i64),
    Text(String),
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(true) => f.write_str("True"),
            Self::Flag(false) => f.write_str("False"),
            Self::Choice(i) => write!(f, "option {}", i + 1),
            Self::Text(s) => f.write_str(s),
        }
    }
}

fn default_points() -> u32 {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(alias = "question")]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub correct_answer: Answer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default = "default_points")]
    pub points: u32,
}

impl QuestionDraft {
    pub fn multiple(prompt: &str, options: &[&str], correct: i64) -> Self {
        Self {
            kind: QuestionType::Multiple,
            prompt: prompt.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: Answer::Choice(correct),
            explanation: None,
            points: default_points(),
        }
    }

    pub fn boolean(prompt: &str, correct: bool) -> Self {
        Self {
            kind: QuestionType::Boolean,
            prompt: prompt.into(),
            options: vec![],
            correct_answer: Answer::Flag(correct),
            explanation: None,
            points: default_points(),
        }
    }

    pub fn text(prompt: &str, correct: &str) -> Self {
        Self {
            kind: QuestionType::Text,
            prompt: prompt.into(),
            options: vec![],
            correct_answer: Answer::Text(correct.into()),
            explanation: None,
            points: default_points(),
        }
    }

    pub fn with_explanation(mut self, explanation: &str) -> Self {
        self.explanation = Some(explanation.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(alias = "question")]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub correct_answer: Answer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default = "default_points")]
    pub points: u32,
}

impl Question {
    pub fn from_draft(draft: QuestionDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: draft.kind,
            prompt: draft.prompt,
            options: draft.options,
            correct_answer: draft.correct_answer,
            explanation: draft.explanation,
            points: draft.points,
        }
    }

    /// Human-readable form of the correct answer, e.g. the text of the
    /// correct option for multiple choice.
    pub fn correct_answer_text(&self) -> Option<String> {
        match (&self.kind, &self.correct_answer) {
            (QuestionType::Multiple, Answer::Choice(i)) => usize::try_from(*i)
                .ok()
                .and_then(|i| self.options.get(i))
                .cloned(),
            (QuestionType::Boolean, Answer::Flag(_)) | (QuestionType::Text, Answer::Text(_)) => {
                Some(self.correct_answer.to_string())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionQuestions {
    pub section_index: usize,
    pub section_title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub question_id: Uuid,
    pub user_answer: Answer,
    pub is_correct: bool,
    pub time_spent_seconds: u64,
    pub attempts: u32,
}
