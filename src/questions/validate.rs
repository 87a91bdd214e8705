use tracing::{debug, warn};

use crate::error::{Result, StudyError};

use super::{Answer, Question, QuestionDraft, QuestionStore, QuestionType};

fn is_valid(kind: QuestionType, options: &[String], answer: &Answer) -> bool {
    match kind {
        QuestionType::Multiple => {
            let in_bounds = match answer {
                Answer::Choice(i) => usize::try_from(*i).is_ok_and(|i| i < options.len()),
                _ => false,
            };
            options.len() >= 2 && in_bounds && options.iter().any(|o| !o.trim().is_empty())
        }
        QuestionType::Boolean => matches!(answer, Answer::Flag(_)),
        QuestionType::Text => matches!(answer, Answer::Text(s) if !s.trim().is_empty()),
    }
}

impl QuestionDraft {
    pub fn is_valid(&self) -> bool {
        is_valid(self.kind, &self.options, &self.correct_answer)
    }
}

impl Question {
    pub fn is_valid(&self) -> bool {
        is_valid(self.kind, &self.options, &self.correct_answer)
    }
}

/// Save an edited question list for one section. Invalid questions are
/// dropped silently; if none survive nothing is written and
/// `NoValidQuestions` is returned for the caller to alert on.
pub fn save_section_questions(
    store: &mut QuestionStore,
    section: usize,
    title: &str,
    questions: Vec<Question>,
) -> Result<usize> {
    let submitted = questions.len();
    let valid: Vec<Question> = questions.into_iter().filter(Question::is_valid).collect();
    if valid.is_empty() {
        warn!(section, submitted, "No valid questions to save");
        return Err(StudyError::NoValidQuestions { section });
    }
    let saved = valid.len();
    if saved < submitted {
        debug!(section, dropped = submitted - saved, "Dropped invalid questions");
    }
    store.replace_questions_for_section(section, title, valid);
    Ok(saved)
}
