mod actions;
mod state;
mod tasks;
pub use state::*;

use actions::{handle_action, handle_quiz_key};
use tasks::{spawn_load, spawn_reload, DocumentSource, TimerSet};

#[cfg(test)]
pub(crate) mod test_helpers;

use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use guided_study::document::Document;
use guided_study::questions::QuestionStore;
use guided_study::study::{Timer, TimerRequest};
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::{ErrorInfo, ErrorPopup, Result};
use crate::keys::preset::KeyContext;
use crate::keys::KeybindingMap;

const TICK: Duration = Duration::from_millis(250);

pub fn handle_key(
    state: &mut AppState,
    key: &KeyEvent,
    keybindings: &KeybindingMap,
) -> Vec<TimerRequest> {
    if state.error_popup.is_some() {
        state.error_popup = None;
        return Vec::new();
    }
    if state.show_help {
        // any key closes help
        state.show_help = false;
        return Vec::new();
    }
    if state.quiz_open() {
        return handle_quiz_key(state, key, keybindings);
    }
    match keybindings.resolve(KeyContext::Reader, key) {
        Some(action) => {
            let action = action.clone();
            handle_action(state, &action)
        }
        None => Vec::new(),
    }
}

pub fn handle_load_error(state: &mut AppState, error: ErrorInfo) {
    state.loading = false;
    state.status_message = None;
    state.error_popup = Some(ErrorPopup::from_error_info(&error));
}

/// Swap in reloaded content. Questions are replaced only when they changed;
/// a failed question reload keeps the current bank.
pub fn handle_document_reloaded(
    state: &mut AppState,
    document: Document,
    questions: Option<QuestionStore>,
) -> Vec<TimerRequest> {
    let Some(study) = state.study.as_mut() else {
        return Vec::new();
    };
    if let Some(questions) = questions.filter(|q| q != study.questions()) {
        study.set_questions(questions);
    }
    let requests = study.document_changed(document);
    debug!(visible = study.visible_keys().len(), "Reload applied");
    requests
}

pub fn handle_timer(state: &mut AppState, timer: Timer) -> Vec<TimerRequest> {
    let requests = match state.study.as_mut() {
        Some(study) => study.fire(timer, Instant::now()),
        None => Vec::new(),
    };
    state.sync_quiz_input();
    requests
}

/// Count a tick; true when the document source is due for a reload.
pub fn tick_reload_due(state: &mut AppState, interval: u32) -> bool {
    if interval == 0 || state.loading || state.study.is_none() || state.quiz_open() {
        state.reload_counter = 0;
        return false;
    }
    state.reload_counter += 1;
    if state.reload_counter >= interval {
        state.reload_counter = 0;
        return true;
    }
    false
}

pub async fn run(config: &AppConfig, terminal: &mut DefaultTerminal) -> Result<()> {
    let keybindings =
        KeybindingMap::from_preset(&config.keybindings.preset, &config.keybindings.bindings)?;
    let source = DocumentSource::from_config(config)?;

    let mut state = AppState::new(
        config.study.session_options(),
        keybindings.hints(KeyContext::Reader),
        keybindings.hints(KeyContext::Quiz),
    );
    let mut timers = TimerSet::default();

    let (tx, mut rx) = mpsc::unbounded_channel::<AppMessage>();

    spawn_load(&source, &tx);

    // Spawn event reader task
    let event_tx = tx.clone();
    tokio::spawn(async move {
        let mut reader = EventStream::new();
        loop {
            match reader.next().await {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if event_tx.send(AppMessage::Key(key)).is_err() {
                        break;
                    }
                }
                Some(Err(_)) => break,
                None => break,
                _ => {}
            }
        }
    });

    // Spawn tick timer
    let tick_tx = tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK);
        loop {
            interval.tick().await;
            if tick_tx.send(AppMessage::Tick).is_err() {
                break;
            }
        }
    });

    loop {
        terminal.draw(|frame| crate::ui::render(frame, &state))?;

        if let Some(msg) = rx.recv().await {
            let requests = match msg {
                AppMessage::Key(key) => handle_key(&mut state, &key, &keybindings),
                AppMessage::Loaded {
                    document,
                    questions,
                } => {
                    info!(title = document.title(), "Document loaded");
                    state.start_session(document, questions);
                    Vec::new()
                }
                AppMessage::DocumentReloaded {
                    document,
                    questions,
                } => handle_document_reloaded(&mut state, document, questions),
                AppMessage::Timer(timer) => handle_timer(&mut state, timer),
                AppMessage::LoadError(err) => {
                    handle_load_error(&mut state, err);
                    Vec::new()
                }
                AppMessage::Tick => {
                    if tick_reload_due(&mut state, config.study.reload_interval_ticks) {
                        spawn_reload(&source, &tx);
                    }
                    Vec::new()
                }
            };
            timers.apply(requests, &tx);
            state.sync_study_state();
        }

        if state.should_quit {
            info!(pending_timers = timers.pending(), "Quitting");
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use super::*;
    use crossterm::event::KeyCode;
    use guided_study::questions::QuestionDraft;
    use guided_study::study::StudyTimer;

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

    #[test]
    fn error_popup_swallows_next_key() {
        let mut state = test_state();
        state.error_popup = Some(ErrorPopup::from_error_info(&ErrorInfo::Load("x".into())));
        handle_key(&mut state, &key(KeyCode::Char('q')), &keymap());
        assert!(state.error_popup.is_none());
        assert!(!state.should_quit);
    }

    #[test]
    fn help_closes_on_any_key() {
        let mut state = test_state();
        let map = keymap();
        handle_key(&mut state, &key(KeyCode::Char('?')), &map);
        assert!(state.show_help);
        handle_key(&mut state, &key(KeyCode::Char('s')), &map);
        assert!(!state.show_help);
        assert!(!state.snapshot().unwrap().enabled);
    }

    #[test]
    fn open_quiz_captures_reader_keys() {
        let mut state = test_state();
        let map = keymap();
        handle_key(&mut state, &key(KeyCode::Char('s')), &map);
        handle_key(&mut state, &key(KeyCode::Enter), &map);
        assert!(state.quiz_open());

        // q is quit in the reader but unbound in the quiz
        handle_key(&mut state, &key(KeyCode::Char('q')), &map);
        assert!(!state.should_quit);
        assert!(state.quiz_open());
    }

    #[test]
    fn load_error_shows_popup() {
        let mut state = AppState::new(Default::default(), vec![], vec![]);
        handle_load_error(
            &mut state,
            ErrorInfo::Api {
                status: 404,
                body: String::new(),
            },
        );
        assert!(!state.loading);
        assert_eq!(state.error_popup.unwrap().title, "Not Found");
    }

    #[test]
    fn completion_timers_run_through_handle_timer() {
        let mut state = test_state();
        let map = keymap();
        handle_key(&mut state, &key(KeyCode::Char('s')), &map);
        // skip the Cells quiz, then finish Energy and Genetics
        handle_key(&mut state, &key(KeyCode::Enter), &map);
        handle_key(&mut state, &key(KeyCode::Esc), &map);
        handle_key(&mut state, &key(KeyCode::Enter), &map);
        let requests = handle_key(&mut state, &key(KeyCode::Enter), &map);

        let snapshot = state.snapshot().unwrap();
        assert!(snapshot.show_completion_toast);
        assert_eq!(snapshot.completed_sections.len(), 3);

        handle_timer(&mut state, study_timer(&requests, StudyTimer::RevealContent));
        assert!(!state.snapshot().unwrap().enabled);
        handle_timer(&mut state, study_timer(&requests, StudyTimer::DismissToast));
        assert!(!state.snapshot().unwrap().show_completion_toast);
        handle_timer(&mut state, study_timer(&requests, StudyTimer::ResetProgress));
        assert!(state.snapshot().unwrap().completed_sections.is_empty());
    }

    #[test]
    fn reload_becomes_due_after_interval() {
        let mut state = test_state();
        assert!(!tick_reload_due(&mut state, 3));
        assert!(!tick_reload_due(&mut state, 3));
        assert!(tick_reload_due(&mut state, 3));
        assert_eq!(state.reload_counter, 0);
    }

    #[test]
    fn reload_disabled_or_paused() {
        let mut state = test_state();
        assert!(!tick_reload_due(&mut state, 0));

        let map = keymap();
        handle_key(&mut state, &key(KeyCode::Char('s')), &map);
        handle_key(&mut state, &key(KeyCode::Enter), &map);
        assert!(state.quiz_open());
        for _ in 0..5 {
            assert!(!tick_reload_due(&mut state, 2));
        }
    }

    #[test]
    fn reloaded_document_keeps_current_section() {
        let mut state = test_state();
        let map = keymap();
        handle_key(&mut state, &key(KeyCode::Char('s')), &map);
        handle_key(&mut state, &key(KeyCode::Char('n')), &map);
        assert_eq!(state.snapshot().unwrap().current_section_index, 1);

        let edited = Document::builder("Biology")
            .heading(1, "Cells")
            .paragraph("Every cell has a membrane.")
            .heading(1, "Energy")
            .paragraph("ATP carries energy, and so does GTP.")
            .heading(1, "Genetics")
            .paragraph("DNA encodes proteins.")
            .build();
        let requests = handle_document_reloaded(&mut state, edited, None);
        assert!(matches!(
            requests.as_slice(),
            [TimerRequest::Schedule {
                timer: Timer::DecoratorSettle { .. },
                ..
            }]
        ));
        let snapshot = state.snapshot().unwrap();
        assert!(snapshot.enabled);
        assert_eq!(snapshot.current_section_index, 1);
    }

    #[test]
    fn unchanged_reload_is_a_no_op() {
        let mut state = test_state();
        let requests = handle_document_reloaded(&mut state, test_document(), None);
        assert!(requests.is_empty());
    }

    #[test]
    fn reloaded_questions_replace_the_bank() {
        let mut state = test_state();
        let mut questions = QuestionStore::new();
        questions.add_question(1, "Energy", QuestionDraft::boolean("ATP stores energy?", true));
        handle_document_reloaded(&mut state, test_document(), Some(questions));

        let map = keymap();
        handle_key(&mut state, &key(KeyCode::Char('s')), &map);
        handle_key(&mut state, &key(KeyCode::Char('c')), &map);
        assert!(!state.quiz_open());
        assert_eq!(state.snapshot().unwrap().current_section_index, 1);
        handle_key(&mut state, &key(KeyCode::Char('c')), &map);
        assert!(state.quiz_open());
    }

    #[test]
    fn failed_question_reload_keeps_the_bank() {
        let mut state = test_state();
        let before = state.study.as_ref().unwrap().questions().clone();
        handle_document_reloaded(&mut state, test_document(), None);
        assert_eq!(state.study.as_ref().unwrap().questions(), &before);
    }

    #[test]
    fn section_change_scrolls_to_top() {
        let mut state = test_state();
        let map = keymap();
        handle_key(&mut state, &key(KeyCode::Char('s')), &map);
        state.sync_study_state();
        state.scroll = 7;
        handle_key(&mut state, &key(KeyCode::Char('n')), &map);
        state.sync_study_state();
        assert_eq!(state.scroll, 0);
    }
}
