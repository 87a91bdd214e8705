use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::document::Document;
use crate::error::{Result, StudyError};
use crate::questions::{Answer, Question, QuestionStore, QuestionType, SectionQuestions};

/// Row of the `documents` table.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DocumentRow {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Lexical editor state, stored either as JSON or as a JSON string.
    pub content: Value,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DocumentRow {
    pub fn into_document(self) -> Result<Document> {
        match &self.content {
            Value::String(raw) => Document::from_lexical_json(&self.title, raw),
            Value::Object(_) => Document::from_lexical_value(&self.title, &self.content),
            other => Err(StudyError::Document(format!(
                "document {} has unexpected content type: {}",
                self.id, other
            ))),
        }
    }
}

fn default_points() -> u32 {
    10
}

/// Row of the `questions` table. One row per question; sections are
/// grouped back together on load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionRow {
    pub id: Uuid,
    pub document_id: String,
    pub section_index: usize,
    pub section_title: String,
    pub position: usize,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: Answer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl QuestionRow {
    pub fn from_question(
        document_id: &str,
        section_index: usize,
        section_title: &str,
        position: usize,
        question: &Question,
    ) -> Self {
        Self {
            id: question.id,
            document_id: document_id.to_string(),
            section_index,
            section_title: section_title.to_string(),
            position,
            kind: question.kind,
            prompt: question.prompt.clone(),
            options: question.options.clone(),
            correct_answer: question.correct_answer.clone(),
            explanation: question.explanation.clone(),
            points: question.points,
            created_at: None,
        }
    }

    pub fn into_question(self) -> Question {
        Question {
            id: self.id,
            kind: self.kind,
            prompt: self.prompt,
            options: self.options,
            correct_answer: self.correct_answer,
            explanation: self.explanation,
            points: self.points,
        }
    }
}

impl QuestionStore {
    /// Group backend rows by section, ordered by position.
    pub fn from_rows(mut rows: Vec<QuestionRow>) -> Self {
        rows.sort_by_key(|r| (r.section_index, r.position));
        let mut sections: Vec<SectionQuestions> = Vec::new();
        for row in rows {
            match sections.last_mut() {
                Some(last) if last.section_index == row.section_index => {
                    last.section_title = row.section_title.clone();
                    last.questions.push(row.into_question());
                }
                _ => sections.push(SectionQuestions {
                    section_index: row.section_index,
                    section_title: row.section_title.clone(),
                    questions: vec![row.into_question()],
                }),
            }
        }
        Self::from_sections(sections)
    }
}
