use crossterm::event::KeyEvent;
use guided_study::document::Document;
use guided_study::questions::{Answer, Question, QuestionStore, QuestionType};
use guided_study::study::{GuidedStudy, SessionOptions, StudyMode, StudyState, Timer};
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ErrorInfo, ErrorPopup};

#[derive(Debug)]
pub enum AppMessage {
    Key(KeyEvent),
    Loaded {
        document: Document,
        questions: QuestionStore,
    },
    DocumentReloaded {
        document: Document,
        questions: Option<QuestionStore>,
    },
    Timer(Timer),
    LoadError(ErrorInfo),
    Tick,
}

/// Answer being composed in the quiz popup. Reset whenever the displayed
/// question changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuizInput {
    pub question_id: Option<Uuid>,
    pub selected: usize,
    pub text: String,
}

impl QuizInput {
    pub fn for_question(question: &Question) -> Self {
        Self {
            question_id: Some(question.id),
            ..Self::default()
        }
    }

    /// Number of selectable rows; text questions have none.
    pub fn choice_count(question: &Question) -> usize {
        match question.kind {
            QuestionType::Multiple => question.options.len(),
            QuestionType::Boolean => 2,
            QuestionType::Text => 0,
        }
    }

    pub fn answer(&self, question: &Question) -> Option<Answer> {
        match question.kind {
            QuestionType::Multiple => (self.selected < question.options.len())
                .then_some(Answer::Choice(self.selected as i64)),
            QuestionType::Boolean => Some(Answer::Flag(self.selected == 0)),
            QuestionType::Text => {
                let text = self.text.trim();
                (!text.is_empty()).then(|| Answer::Text(text.to_string()))
            }
        }
    }
}

pub struct AppState {
    pub study: Option<GuidedStudy>,
    pub study_rx: Option<watch::Receiver<StudyState>>,
    pub visible_section: Option<usize>,
    pub options: SessionOptions,
    pub scroll: usize,
    pub quiz_input: QuizInput,
    pub loading: bool,
    pub should_quit: bool,
    pub show_help: bool,
    pub error_popup: Option<ErrorPopup>,
    pub status_message: Option<String>,
    pub hints: Vec<(String, &'static str)>,
    pub quiz_hints: Vec<(String, &'static str)>,
    pub reload_counter: u32,
}

impl AppState {
    pub fn new(
        options: SessionOptions,
        hints: Vec<(String, &'static str)>,
        quiz_hints: Vec<(String, &'static str)>,
    ) -> Self {
        Self {
            study: None,
            study_rx: None,
            visible_section: None,
            options,
            scroll: 0,
            quiz_input: QuizInput::default(),
            loading: true,
            should_quit: false,
            show_help: false,
            error_popup: None,
            status_message: Some("Loading document...".into()),
            hints,
            quiz_hints,
            reload_counter: 0,
        }
    }

    pub fn start_session(&mut self, document: Document, questions: QuestionStore) {
        let study = GuidedStudy::new(document, questions, self.options);
        self.study_rx = Some(study.subscribe());
        self.visible_section = study.state().visible_section();
        self.study = Some(study);
        self.loading = false;
        self.scroll = 0;
        self.status_message = None;
    }

    pub fn snapshot(&self) -> Option<StudyState> {
        self.study.as_ref().map(GuidedStudy::state)
    }

    pub fn mode(&self) -> StudyMode {
        self.options.mode
    }

    pub fn read_only(&self) -> bool {
        self.options.read_only
    }

    /// True while a quiz popup owns the keyboard.
    pub fn quiz_open(&self) -> bool {
        self.study.as_ref().and_then(GuidedStudy::quiz).is_some()
    }

    /// Pick up published study changes: scroll back to the top when the
    /// visible section moves.
    pub fn sync_study_state(&mut self) {
        let Some(rx) = self.study_rx.as_mut() else {
            return;
        };
        if !rx.has_changed().unwrap_or(false) {
            return;
        }
        let visible = rx.borrow_and_update().visible_section();
        if visible != self.visible_section {
            debug!(?visible, "Visible section moved");
            self.visible_section = visible;
            self.scroll = 0;
        }
    }

    /// Reset the composed answer when the quiz shows a different question.
    pub fn sync_quiz_input(&mut self) {
        let current = self
            .study
            .as_ref()
            .and_then(GuidedStudy::quiz)
            .and_then(|gate| gate.current_question());
        match current {
            Some(q) if self.quiz_input.question_id != Some(q.id) => {
                self.quiz_input = QuizInput::for_question(q);
            }
            Some(_) => {}
            None => self.quiz_input = QuizInput::default(),
        }
    }
}
