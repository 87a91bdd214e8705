use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

use super::{Question, QuestionDraft, SectionQuestions};

/// Read side of a question store, as seen by the study state machine.
pub trait QuestionLookup {
    fn has_questions(&self, section: usize) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStats {
    pub total_questions: usize,
    pub sections_with_questions: usize,
    pub average_questions_per_section: f64,
}

/// Questions keyed by section index. Titles ride along for display only.
/// The store does not validate what it is given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionStore {
    sections: BTreeMap<usize, SectionQuestions>,
}

impl QuestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sections(sections: impl IntoIterator<Item = SectionQuestions>) -> Self {
        Self {
            sections: sections
                .into_iter()
                .map(|s| (s.section_index, s))
                .collect(),
        }
    }

    /// Parse a question bank: a JSON array of section entries.
    pub fn from_json(raw: &str) -> Result<Self> {
        let sections: Vec<SectionQuestions> = serde_json::from_str(raw)?;
        Ok(Self::from_sections(sections))
    }

    pub fn to_json(&self) -> Result<String> {
        let sections: Vec<&SectionQuestions> = self.sections.values().collect();
        Ok(serde_json::to_string_pretty(&sections)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn get_questions_for_section(&self, section: usize) -> Option<&SectionQuestions> {
        self.sections.get(&section)
    }

    pub fn add_question(&mut self, section: usize, title: &str, draft: QuestionDraft) -> Question {
        let question = Question::from_draft(draft);
        let entry = self
            .sections
            .entry(section)
            .or_insert_with(|| SectionQuestions {
                section_index: section,
                section_title: title.to_string(),
                questions: Vec::new(),
            });
        entry.section_title = title.to_string();
        entry.questions.push(question.clone());
        debug!(section, id = %question.id, "Question added");
        question
    }

    pub fn remove_question(&mut self, section: usize, id: Uuid) {
        if let Some(entry) = self.sections.get_mut(&section) {
            let before = entry.questions.len();
            entry.questions.retain(|q| q.id != id);
            if entry.questions.len() != before {
                debug!(section, %id, "Question removed");
            }
        }
    }

    /// Replace a section's questions in one map update. An empty list still
    /// installs an (empty) entry.
    pub fn replace_questions_for_section(
        &mut self,
        section: usize,
        title: &str,
        questions: Vec<Question>,
    ) {
        debug!(section, count = questions.len(), "Replacing section questions");
        self.sections.insert(
            section,
            SectionQuestions {
                section_index: section,
                section_title: title.to_string(),
                questions,
            },
        );
    }

    pub fn has_questions(&self, section: usize) -> bool {
        self.sections
            .get(&section)
            .is_some_and(|s| !s.questions.is_empty())
    }

    pub fn sections(&self) -> impl Iterator<Item = &SectionQuestions> {
        self.sections.values()
    }

    pub fn get_stats(&self) -> QuestionStats {
        let total_questions: usize = self.sections.values().map(|s| s.questions.len()).sum();
        let sections_with_questions = self
            .sections
            .values()
            .filter(|s| !s.questions.is_empty())
            .count();
        let average_questions_per_section = if sections_with_questions == 0 {
            0.0
        } else {
            total_questions as f64 / sections_with_questions as f64
        };
        QuestionStats {
            total_questions,
            sections_with_questions,
            average_questions_per_section,
        }
    }
}

impl QuestionLookup for QuestionStore {
    fn has_questions(&self, section: usize) -> bool {
        QuestionStore::has_questions(self, section)
    }
}
