use std::collections::HashMap;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use guided_study::document::Document;
use guided_study::questions::{Answer, QuestionDraft, QuestionStore};
use guided_study::study::{SessionOptions, TimerRequest};

use crate::keys::preset::KeyContext;
use crate::keys::KeybindingMap;

use super::AppState;

pub fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

pub fn keymap() -> KeybindingMap {
    KeybindingMap::from_preset("vim", &HashMap::new()).unwrap()
}

/// Cells (two questions), Energy (none), Genetics (none).
pub fn test_document() -> Document {
    Document::builder("Biology")
        .heading(1, "Cells")
        .paragraph("Every cell has a membrane.")
        .heading(1, "Energy")
        .paragraph("ATP carries energy.")
        .video("https://example.com/atp")
        .heading(1, "Genetics")
        .paragraph("DNA encodes proteins.")
        .build()
}

pub fn test_questions() -> QuestionStore {
    let mut store = QuestionStore::new();
    store.add_question(0, "Cells", QuestionDraft::boolean("Cells have membranes?", true));
    store.add_question(
        0,
        "Cells",
        QuestionDraft::text("Powerhouse of the cell?", "Mitochondria")
            .with_explanation("It produces ATP."),
    );
    store
}

pub fn test_state() -> AppState {
    let map = keymap();
    let mut state = AppState::new(
        SessionOptions::default(),
        map.hints(KeyContext::Reader),
        map.hints(KeyContext::Quiz),
    );
    state.start_session(test_document(), test_questions());
    state
}

/// Answer the first quiz question correctly and move past its feedback.
pub fn answer_first_question(state: &mut AppState) {
    let now = Instant::now();
    let study = state.study.as_mut().unwrap();
    let (_, requests) = study.submit_answer(Answer::Flag(true), now).unwrap();
    for request in requests {
        if let TimerRequest::Schedule { timer, .. } = request {
            study.fire(timer, now);
        }
    }
}
