use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info};

use crate::document::{Document, NodeKey, Section, SectionCache};
use crate::error::{Result, StudyError};
use crate::questions::{save_section_questions, Answer, Question, QuestionStore};
use crate::quiz::{QuizGate, QuizSummary, SubmitOutcome};
use crate::render::{DecoratorAssociation, RenderedDocument, VisibilityProjector};

use super::machine::{StudyEffect, StudyEnvironment, StudyMachine, TimerTicket};
use super::state::{StudyMode, StudyState, StudyTimings};

/// Delayed callbacks the host delivers back through [`GuidedStudy::fire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    Study(TimerTicket),
    /// Move the open quiz past its feedback.
    QuizAdvance { generation: u64 },
    /// Decorators of this document revision have mounted.
    DecoratorSettle { revision: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerRequest {
    Schedule { timer: Timer, after: Duration },
    /// Abort every pending timer.
    CancelAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub read_only: bool,
    pub mode: StudyMode,
    pub association: DecoratorAssociation,
    pub timings: StudyTimings,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            read_only: true,
            mode: StudyMode::Guided,
            association: DecoratorAssociation::default(),
            timings: StudyTimings::default(),
        }
    }
}

/// One document under study: its sections, questions, rendered output and
/// the state machine driving what is visible.
pub struct GuidedStudy {
    document: Document,
    sections: SectionCache,
    questions: QuestionStore,
    machine: StudyMachine,
    rendered: RenderedDocument,
    projector: VisibilityProjector,
    quiz: Option<QuizGate>,
    quiz_generation: u64,
    timings: StudyTimings,
    last_summary: Option<QuizSummary>,
}

impl GuidedStudy {
    pub fn new(document: Document, questions: QuestionStore, options: SessionOptions) -> Self {
        let mut sections = SectionCache::new();
        let total_sections = sections.get(&document).len();
        let rendered = RenderedDocument::render(&document);
        info!(
            title = document.title(),
            total_sections,
            "Study session ready"
        );
        Self {
            machine: StudyMachine::new(
                StudyEnvironment {
                    read_only: options.read_only,
                    mode: options.mode,
                    total_sections,
                },
                options.timings,
            ),
            document,
            sections,
            questions,
            rendered,
            projector: VisibilityProjector::new(options.association),
            quiz: None,
            quiz_generation: 0,
            timings: options.timings,
            last_summary: None,
        }
    }

    pub fn state(&self) -> StudyState {
        self.machine.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<StudyState> {
        self.machine.subscribe()
    }

    pub fn can_enable(&self) -> bool {
        self.machine.can_enable()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn sections(&mut self) -> &[Section] {
        self.sections.get(&self.document)
    }

    pub fn questions(&self) -> &QuestionStore {
        &self.questions
    }

    pub fn rendered(&self) -> &RenderedDocument {
        &self.rendered
    }

    pub fn visible_keys(&self) -> Vec<NodeKey> {
        self.rendered.visible_keys()
    }

    pub fn quiz(&self) -> Option<&QuizGate> {
        self.quiz.as_ref()
    }

    /// Score of the most recently completed quiz.
    pub fn last_summary(&self) -> Option<QuizSummary> {
        self.last_summary
    }

    pub fn toggle_study(&mut self) -> Vec<TimerRequest> {
        let effects = self.machine.toggle();
        self.apply(effects, Instant::now())
    }

    pub fn set_read_only(&mut self, read_only: bool) -> Vec<TimerRequest> {
        let effects = self.machine.set_read_only(read_only);
        self.apply(effects, Instant::now())
    }

    pub fn set_mode(&mut self, mode: StudyMode) -> Vec<TimerRequest> {
        let effects = self.machine.set_mode(mode);
        self.apply(effects, Instant::now())
    }

    pub fn mark_section_complete(&mut self, section: usize, now: Instant) -> Vec<TimerRequest> {
        let effects = self.machine.mark_section_complete(section, &self.questions);
        self.apply(effects, now)
    }

    pub fn next_section(&mut self) -> Vec<TimerRequest> {
        let effects = self.machine.next_section();
        self.apply(effects, Instant::now())
    }

    pub fn submit_answer(
        &mut self,
        answer: Answer,
        now: Instant,
    ) -> Result<(SubmitOutcome, Vec<TimerRequest>)> {
        let Some(gate) = self.quiz.as_mut() else {
            return Err(StudyError::QuizClosed {
                section: self.machine.state().current_section_index,
            });
        };
        let outcome = gate.submit(answer, now)?;
        let requests = match &outcome {
            SubmitOutcome::Feedback(_) => vec![TimerRequest::Schedule {
                timer: Timer::QuizAdvance {
                    generation: self.quiz_generation,
                },
                after: self.timings.quiz_feedback_delay,
            }],
            SubmitOutcome::Completed { responses, .. } => {
                let summary = QuizSummary::from_responses(gate.questions(), responses);
                info!(
                    section = gate.section_index(),
                    correct = summary.correct,
                    total = summary.total,
                    points = summary.points_earned,
                    "Quiz scored"
                );
                self.last_summary = Some(summary);
                self.close_quiz();
                let effects = self.machine.quiz_completed();
                self.apply(effects, now)
            }
        };
        Ok((outcome, requests))
    }

    pub fn skip_quiz(&mut self) -> Result<Vec<TimerRequest>> {
        let Some(gate) = self.quiz.as_mut() else {
            debug!("Skip requested with no quiz open");
            return Ok(Vec::new());
        };
        gate.skip()?;
        self.close_quiz();
        let effects = self.machine.quiz_skipped();
        Ok(self.apply(effects, Instant::now()))
    }

    /// Swap in new document content. The structure pass runs at once; the
    /// decorator pass waits for the settle delay.
    pub fn document_changed(&mut self, document: Document) -> Vec<TimerRequest> {
        if !self.document.replace_content(document) {
            return Vec::new();
        }
        let total = self.sections.get(&self.document).len();
        let revision = self.document.revision();
        info!(revision, total_sections = total, "Document changed");

        self.rendered = RenderedDocument::render(&self.document);
        let effects = self.machine.set_total_sections(total);
        let mut requests = self.apply(effects, Instant::now());
        // apply() may have projected already; the fresh render still needs its
        // structure pass when nothing moved
        let visible = self.machine.state().visible_section();
        self.projector
            .project_structure(&mut self.rendered, &self.document, visible);
        requests.push(TimerRequest::Schedule {
            timer: Timer::DecoratorSettle { revision },
            after: self.timings.settle_delay,
        });
        requests
    }

    pub fn fire(&mut self, timer: Timer, now: Instant) -> Vec<TimerRequest> {
        match timer {
            Timer::Study(ticket) => {
                let effects = self.machine.fire(ticket);
                self.apply(effects, now)
            }
            Timer::QuizAdvance { generation } => {
                match self.quiz.as_mut() {
                    Some(gate) if generation == self.quiz_generation => {
                        gate.advance(now);
                    }
                    _ => debug!(generation, "Stale quiz advance ignored"),
                }
                Vec::new()
            }
            Timer::DecoratorSettle { revision } => {
                if revision != self.document.revision() {
                    debug!(revision, "Stale decorator pass ignored");
                    return Vec::new();
                }
                let visible = self.machine.state().visible_section();
                let sections = self.sections.get(&self.document);
                self.projector.project_decorators(
                    &mut self.rendered,
                    &self.document,
                    sections,
                    visible,
                );
                Vec::new()
            }
        }
    }

    pub fn save_section_questions(
        &mut self,
        section: usize,
        title: &str,
        questions: Vec<Question>,
    ) -> Result<usize> {
        save_section_questions(&mut self.questions, section, title, questions)
    }

    pub fn set_questions(&mut self, questions: QuestionStore) {
        debug!(
            sections = questions.sections().count(),
            "Question store replaced"
        );
        self.questions = questions;
    }

    fn close_quiz(&mut self) {
        if self.quiz.take().is_some() {
            self.quiz_generation += 1;
        }
    }

    fn apply(&mut self, effects: Vec<StudyEffect>, now: Instant) -> Vec<TimerRequest> {
        let mut queue: VecDeque<StudyEffect> = effects.into();
        let mut requests = Vec::new();
        let mut reproject = false;

        while let Some(effect) = queue.pop_front() {
            match effect {
                StudyEffect::OpenQuiz { section } => {
                    let gate = self
                        .questions
                        .get_questions_for_section(section)
                        .cloned()
                        .and_then(|questions| QuizGate::open(questions, now));
                    match gate {
                        Some(gate) => {
                            self.quiz = Some(gate);
                            self.quiz_generation += 1;
                        }
                        None => {
                            debug!(section, "No questions to show; skipping quiz");
                            queue.extend(self.machine.quiz_skipped());
                        }
                    }
                }
                StudyEffect::CloseQuiz => self.close_quiz(),
                StudyEffect::Reproject => reproject = true,
                StudyEffect::Schedule { ticket, after } => {
                    requests.push(TimerRequest::Schedule {
                        timer: Timer::Study(ticket),
                        after,
                    });
                }
                StudyEffect::CancelTimers => requests.push(TimerRequest::CancelAll),
            }
        }

        if reproject {
            let visible = self.machine.state().visible_section();
            let sections = self.sections.get(&self.document);
            self.projector
                .project(&mut self.rendered, &self.document, sections, visible);
        }
        requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::QuestionDraft;
    use crate::study::machine::StudyTimer;

    fn three_sections() -> Document {
        Document::builder("Biology")
            .heading(1, "Cells")
            .paragraph("cell body")
            .heading(1, "Energy")
            .paragraph("energy body")
            .video("https://example.com/atp")
            .heading(1, "Genetics")
            .paragraph("genetics body")
            .build()
    }

    fn visible_text(study: &GuidedStudy) -> Vec<String> {
        study
            .rendered()
            .visible_elements()
            .filter(|e| !e.text.is_empty())
            .map(|e| e.text.clone())
            .collect()
    }

    fn study_timer(requests: &[TimerRequest], which: StudyTimer) -> Timer {
        requests
            .iter()
            .find_map(|r| match r {
                TimerRequest::Schedule {
                    timer: Timer::Study(ticket),
                    ..
                } if ticket.timer == which => Some(Timer::Study(*ticket)),
                _ => None,
            })
            .unwrap()
    }

    fn keys(state: &StudyState) -> Vec<String> {
        state
            .completed_sections
            .iter()
            .map(|k| k.to_string())
            .collect()
    }

    #[test]
    fn sections_without_questions_walk_through_to_completion() {
        let now = Instant::now();
        let mut study = GuidedStudy::new(
            three_sections(),
            QuestionStore::new(),
            SessionOptions::default(),
        );
        assert_eq!(visible_text(&study).len(), 6);

        study.toggle_study();
        assert_eq!(visible_text(&study), vec!["Cells", "cell body"]);

        study.mark_section_complete(0, now);
        let state = study.state();
        assert_eq!(state.current_section_index, 1);
        assert_eq!(keys(&state), vec!["section-0"]);
        assert_eq!(visible_text(&study), vec!["Energy", "energy body"]);

        study.mark_section_complete(1, now);
        let requests = study.mark_section_complete(2, now);
        let state = study.state();
        assert!(state.show_completion_toast);
        assert!(state.enabled);
        assert_eq!(keys(&state).len(), 3);

        study.fire(study_timer(&requests, StudyTimer::RevealContent), now);
        assert!(!study.state().enabled);
        assert_eq!(visible_text(&study).len(), 6);
        assert!(study
            .rendered()
            .stylesheet(crate::render::STYLESHEET_ID)
            .is_none());

        study.fire(study_timer(&requests, StudyTimer::DismissToast), now);
        study.fire(study_timer(&requests, StudyTimer::ResetProgress), now);
        let state = study.state();
        assert!(state.completed_sections.is_empty());
        assert!(!state.show_completion_toast);
        assert_eq!(state.current_section_index, 0);
    }

    #[test]
    fn decorators_follow_the_visible_section() {
        let mut study = GuidedStudy::new(
            three_sections(),
            QuestionStore::new(),
            SessionOptions::default(),
        );
        study.toggle_study();
        assert!(study.rendered().visible_elements().all(|e| !e.decorator));
        study.next_section();
        let visible: Vec<&str> = study
            .rendered()
            .visible_elements()
            .filter(|e| e.decorator)
            .map(|e| e.tag)
            .collect();
        assert_eq!(visible, vec!["iframe"]);
    }

    #[test]
    fn quiz_gates_the_section_and_advances_after_answers() {
        let now = Instant::now();
        let mut questions = QuestionStore::new();
        let first = questions.add_question(1, "Energy", QuestionDraft::boolean("ATP?", true));
        let second = questions.add_question(1, "Energy", QuestionDraft::text("Organelle?", "mitochondria"));
        let mut study = GuidedStudy::new(three_sections(), questions, SessionOptions::default());

        study.toggle_study();
        study.next_section();
        study.mark_section_complete(1, now);

        let state = study.state();
        assert_eq!(state.pending_quiz_section_index, Some(1));
        assert!(state.show_quiz_modal);
        let gate = study.quiz().unwrap();
        assert_eq!(
            gate.questions().iter().map(|q| q.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );

        let (outcome, requests) = study.submit_answer(Answer::Flag(false), now).unwrap();
        assert!(matches!(outcome, SubmitOutcome::Feedback(_)));
        let [TimerRequest::Schedule { timer, after }] = requests.as_slice() else {
            panic!("Expected one advance timer, got {:?}", requests);
        };
        assert_eq!(*after, Duration::from_millis(2000));
        study.fire(*timer, now);

        let (outcome, _) = study
            .submit_answer(Answer::Text("Mitochondria".into()), now)
            .unwrap();
        match outcome {
            SubmitOutcome::Completed { responses, .. } => assert_eq!(responses.len(), 2),
            other => panic!("Expected completion, got {:?}", other),
        }

        let state = study.state();
        assert!(!state.show_quiz_modal);
        assert_eq!(state.pending_quiz_section_index, None);
        assert_eq!(state.current_section_index, 2);
        assert!(study.quiz().is_none());
        let summary = study.last_summary().unwrap();
        assert_eq!((summary.correct, summary.total), (1, 2));
    }

    #[test]
    fn skipping_the_last_quiz_finishes_the_session() {
        let now = Instant::now();
        let mut questions = QuestionStore::new();
        questions.add_question(0, "Only", QuestionDraft::boolean("?", true));
        let doc = Document::builder("One").heading(1, "Only").build();
        let mut study = GuidedStudy::new(doc, questions, SessionOptions::default());

        study.toggle_study();
        study.mark_section_complete(0, now);
        let requests = study.skip_quiz().unwrap();
        assert!(study.quiz().is_none());
        assert!(study.state().show_completion_toast);
        assert_eq!(
            requests
                .iter()
                .filter(|r| matches!(r, TimerRequest::Schedule { .. }))
                .count(),
            3
        );
    }

    #[test]
    fn emptied_section_does_not_gate() {
        let now = Instant::now();
        let mut questions = QuestionStore::new();
        questions.add_question(1, "Energy", QuestionDraft::boolean("?", true));
        questions.replace_questions_for_section(1, "Title", vec![]);
        assert!(!questions.has_questions(1));
        assert_eq!(questions.get_questions_for_section(1).unwrap().questions.len(), 0);

        let mut study = GuidedStudy::new(three_sections(), questions, SessionOptions::default());
        study.toggle_study();
        study.next_section();
        study.mark_section_complete(1, now);
        assert!(!study.state().show_quiz_modal);
        assert_eq!(study.state().current_section_index, 2);
    }

    #[test]
    fn stale_quiz_advance_is_ignored() {
        let now = Instant::now();
        let mut questions = QuestionStore::new();
        questions.add_question(0, "Cells", QuestionDraft::boolean("a", true));
        questions.add_question(0, "Cells", QuestionDraft::boolean("b", true));
        let mut study = GuidedStudy::new(three_sections(), questions, SessionOptions::default());

        study.toggle_study();
        study.mark_section_complete(0, now);
        let (_, requests) = study.submit_answer(Answer::Flag(true), now).unwrap();
        let TimerRequest::Schedule { timer, .. } = requests[0] else {
            panic!("Expected a schedule");
        };

        // Leaving read-only closes the quiz before the advance fires.
        let cancel = study.set_read_only(false);
        assert_eq!(cancel[0], TimerRequest::CancelAll);
        assert!(study.quiz().is_none());
        assert!(study.fire(timer, now).is_empty());
        assert!(study.quiz().is_none());
    }

    #[test]
    fn document_edit_clamps_and_reprojects() {
        let mut study = GuidedStudy::new(
            three_sections(),
            QuestionStore::new(),
            SessionOptions::default(),
        );
        study.toggle_study();
        study.next_section();
        study.next_section();

        let shorter = Document::builder("Biology")
            .heading(1, "Cells")
            .paragraph("cell body")
            .image("cell.png", "cell")
            .build();
        let requests = study.document_changed(shorter);
        assert_eq!(study.state().current_section_index, 0);
        assert_eq!(visible_text(&study), vec!["Cells", "cell body"]);

        let settle = requests
            .iter()
            .find_map(|r| match r {
                TimerRequest::Schedule {
                    timer: timer @ Timer::DecoratorSettle { .. },
                    after,
                } => Some((*timer, *after)),
                _ => None,
            })
            .unwrap();
        assert_eq!(settle.1, Duration::from_millis(200));
        study.fire(settle.0, Instant::now());
        let image = study.rendered().find(&NodeKey::from("5")).unwrap();
        assert!(study.rendered().is_visible(image.id));
    }

    #[test]
    fn unchanged_document_is_a_noop() {
        let mut study = GuidedStudy::new(
            three_sections(),
            QuestionStore::new(),
            SessionOptions::default(),
        );
        assert!(study.document_changed(three_sections()).is_empty());
        assert_eq!(study.document().revision(), 0);
    }

    #[test]
    fn removing_all_sections_ends_study() {
        let mut study = GuidedStudy::new(
            three_sections(),
            QuestionStore::new(),
            SessionOptions::default(),
        );
        study.toggle_study();
        study.document_changed(Document::builder("Biology").paragraph("draft").build());
        assert!(!study.state().enabled);
        assert!(!study.can_enable());
        assert_eq!(visible_text(&study), vec!["draft"]);
    }

    #[test]
    fn manual_mode_cannot_start_study() {
        let mut study = GuidedStudy::new(
            three_sections(),
            QuestionStore::new(),
            SessionOptions {
                mode: StudyMode::Manual,
                ..SessionOptions::default()
            },
        );
        assert!(study.toggle_study().is_empty());
        assert_eq!(visible_text(&study).len(), 6);
    }

    #[test]
    fn saving_invalid_questions_reports_error() {
        let mut study = GuidedStudy::new(
            three_sections(),
            QuestionStore::new(),
            SessionOptions::default(),
        );
        let bad = Question::from_draft(QuestionDraft::text("?", ""));
        assert!(study.save_section_questions(0, "Cells", vec![bad]).is_err());
        let good = Question::from_draft(QuestionDraft::text("?", "yes"));
        assert_eq!(study.save_section_questions(0, "Cells", vec![good]).unwrap(), 1);
        assert!(study.questions().has_questions(0));
    }

    #[test]
    fn subscribers_observe_session_state() {
        let mut study = GuidedStudy::new(
            three_sections(),
            QuestionStore::new(),
            SessionOptions::default(),
        );
        let rx = study.subscribe();
        study.toggle_study();
        assert!(rx.borrow().enabled);
        assert_eq!(study.state(), *rx.borrow());
    }
}
