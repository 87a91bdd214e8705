use std::time::Instant;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, StudyError};
use crate::questions::{Answer, Question, QuestionResponse, QuestionType, SectionQuestions};

/// Grade `answer` against `question`. Multiple choice and boolean compare
/// strictly; text compares trimmed and case-insensitively.
pub fn grade(question: &Question, answer: &Answer) -> bool {
    match (question.kind, &question.correct_answer, answer) {
        (QuestionType::Multiple, Answer::Choice(expected), Answer::Choice(given)) => {
            expected == given
        }
        (QuestionType::Boolean, Answer::Flag(expected), Answer::Flag(given)) => expected == given,
        (QuestionType::Text, Answer::Text(expected), Answer::Text(given)) => {
            expected.trim().to_lowercase() == given.trim().to_lowercase()
        }
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub question_id: Uuid,
    pub is_correct: bool,
    /// Shown when the answer was wrong.
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// More questions remain; call `advance` after the feedback delay.
    Feedback(Feedback),
    /// That was the last question.
    Completed {
        feedback: Feedback,
        responses: Vec<QuestionResponse>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuizOutcome {
    Completed(Vec<QuestionResponse>),
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
enum GatePhase {
    Answering,
    Feedback(Feedback),
    Closed,
}

/// One section's quiz. Ends with exactly one of completion or skip.
#[derive(Debug, Clone)]
pub struct QuizGate {
    section: SectionQuestions,
    current: usize,
    shown_at: Instant,
    responses: Vec<QuestionResponse>,
    phase: GatePhase,
}

impl QuizGate {
    /// Returns `None` when the section has no questions to ask.
    pub fn open(section: SectionQuestions, now: Instant) -> Option<Self> {
        if section.questions.is_empty() {
            return None;
        }
        info!(
            section = section.section_index,
            questions = section.questions.len(),
            "Quiz opened"
        );
        Some(Self {
            section,
            current: 0,
            shown_at: now,
            responses: Vec::new(),
            phase: GatePhase::Answering,
        })
    }

    pub fn section_index(&self) -> usize {
        self.section.section_index
    }

    pub fn section_title(&self) -> &str {
        &self.section.section_title
    }

    pub fn questions(&self) -> &[Question] {
        &self.section.questions
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            GatePhase::Closed => None,
            _ => self.section.questions.get(self.current),
        }
    }

    /// `(1-based position, total)` of the question on screen.
    pub fn progress(&self) -> (usize, usize) {
        (self.current + 1, self.section.questions.len())
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        match &self.phase {
            GatePhase::Feedback(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.phase == GatePhase::Closed
    }

    pub fn submit(&mut self, answer: Answer, now: Instant) -> Result<SubmitOutcome> {
        match self.phase {
            GatePhase::Answering => {}
            GatePhase::Feedback(_) => return Err(StudyError::QuizAwaitingAdvance),
            GatePhase::Closed => {
                return Err(StudyError::QuizClosed {
                    section: self.section.section_index,
                })
            }
        }
        let question = &self.section.questions[self.current];
        let is_correct = grade(question, &answer);
        let feedback = Feedback {
            question_id: question.id,
            is_correct,
            correct_answer: if is_correct {
                None
            } else {
                question.correct_answer_text()
            },
            explanation: question.explanation.clone(),
        };
        self.responses.push(QuestionResponse {
            question_id: question.id,
            user_answer: answer,
            is_correct,
            time_spent_seconds: now.saturating_duration_since(self.shown_at).as_secs(),
            attempts: 1,
        });
        debug!(
            section = self.section.section_index,
            question = self.current,
            is_correct,
            "Answer recorded"
        );

        if self.current + 1 < self.section.questions.len() {
            self.phase = GatePhase::Feedback(feedback.clone());
            Ok(SubmitOutcome::Feedback(feedback))
        } else {
            self.phase = GatePhase::Closed;
            info!(
                section = self.section.section_index,
                answered = self.responses.len(),
                "Quiz completed"
            );
            Ok(SubmitOutcome::Completed {
                feedback,
                responses: std::mem::take(&mut self.responses),
            })
        }
    }

    /// Move past the feedback to the next question. Returns false when
    /// there was no feedback on screen.
    pub fn advance(&mut self, now: Instant) -> bool {
        if !matches!(self.phase, GatePhase::Feedback(_)) {
            return false;
        }
        self.current += 1;
        self.shown_at = now;
        self.phase = GatePhase::Answering;
        true
    }

    /// Abandon the quiz. Responses collected so far are discarded.
    pub fn skip(&mut self) -> Result<QuizOutcome> {
        match self.phase {
            GatePhase::Answering => {
                self.phase = GatePhase::Closed;
                self.responses.clear();
                info!(section = self.section.section_index, "Quiz skipped");
                Ok(QuizOutcome::Skipped)
            }
            GatePhase::Feedback(_) => Err(StudyError::QuizAwaitingAdvance),
            GatePhase::Closed => Err(StudyError::QuizClosed {
                section: self.section.section_index,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuizSummary {
    pub correct: usize,
    pub total: usize,
    pub points_earned: u32,
}

impl QuizSummary {
    pub fn from_responses(questions: &[Question], responses: &[QuestionResponse]) -> Self {
        let points_earned = responses
            .iter()
            .filter(|r| r.is_correct)
            .filter_map(|r| questions.iter().find(|q| q.id == r.question_id))
            .map(|q| q.points)
            .sum();
        Self {
            correct: responses.iter().filter(|r| r.is_correct).count(),
            total: responses.len(),
            points_earned,
        }
    }
}
