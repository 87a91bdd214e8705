use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use guided_study::quiz::{Feedback, SubmitOutcome};
use guided_study::study::TimerRequest;
use tracing::debug;

use crate::error::{ErrorInfo, ErrorPopup, StudyError};
use crate::keys::preset::{Action, KeyContext};
use crate::keys::KeybindingMap;

use super::state::{AppState, QuizInput};

/// Run a reader action. Returns the timers the session asked for.
pub fn handle_action(state: &mut AppState, action: &Action) -> Vec<TimerRequest> {
    match action {
        Action::Quit => {
            state.should_quit = true;
            Vec::new()
        }
        Action::Help => {
            state.show_help = true;
            Vec::new()
        }
        Action::ScrollUp => {
            state.scroll = state.scroll.saturating_sub(1);
            Vec::new()
        }
        Action::ScrollDown => {
            state.scroll += 1;
            Vec::new()
        }
        Action::ToggleReadOnly => {
            state.options.read_only = !state.options.read_only;
            state.status_message = Some(if state.options.read_only {
                "Read-only".into()
            } else {
                "Editing enabled".into()
            });
            let read_only = state.options.read_only;
            with_study(state, |study| study.set_read_only(read_only))
        }
        Action::ToggleMode => {
            state.options.mode = state.options.mode.toggled();
            state.status_message = Some(format!("Mode: {}", state.options.mode));
            let mode = state.options.mode;
            with_study(state, |study| study.set_mode(mode))
        }
        Action::ToggleStudy => toggle_study(state),
        Action::MarkComplete => mark_complete(state),
        Action::NextSection => with_study(state, |study| study.next_section()),
        // quiz actions only resolve in the quiz context
        Action::QuizUp | Action::QuizDown | Action::Submit | Action::SkipQuiz => Vec::new(),
    }
}

fn with_study(
    state: &mut AppState,
    f: impl FnOnce(&mut guided_study::GuidedStudy) -> Vec<TimerRequest>,
) -> Vec<TimerRequest> {
    match state.study.as_mut() {
        Some(study) => f(study),
        None => Vec::new(),
    }
}

fn toggle_study(state: &mut AppState) -> Vec<TimerRequest> {
    let Some(study) = state.study.as_mut() else {
        return Vec::new();
    };
    if !study.state().enabled && !study.can_enable() {
        state.status_message =
            Some("Study mode needs read-only, guided mode and at least one section".into());
        return Vec::new();
    }
    let requests = study.toggle_study();
    state.status_message = Some(if study.state().enabled {
        "Study mode on".into()
    } else {
        "Study mode off".into()
    });
    requests
}

fn mark_complete(state: &mut AppState) -> Vec<TimerRequest> {
    let Some(study) = state.study.as_mut() else {
        return Vec::new();
    };
    let snapshot = study.state();
    if !snapshot.enabled {
        state.status_message = Some("Study mode is off".into());
        return Vec::new();
    }
    study.mark_section_complete(snapshot.current_section_index, Instant::now())
}

/// Keys while the quiz popup is open. Text questions take typed characters
/// before any binding except submit and skip.
pub fn handle_quiz_key(
    state: &mut AppState,
    key: &KeyEvent,
    keybindings: &KeybindingMap,
) -> Vec<TimerRequest> {
    state.sync_quiz_input();
    let Some(question) = state
        .study
        .as_ref()
        .and_then(|s| s.quiz())
        .and_then(|gate| gate.current_question())
        .cloned()
    else {
        return Vec::new();
    };

    let action = keybindings.resolve(KeyContext::Quiz, key).cloned();
    let choices = QuizInput::choice_count(&question);
    let typing = choices == 0 && !matches!(action, Some(Action::Submit | Action::SkipQuiz));

    let answered = state
        .study
        .as_ref()
        .and_then(|s| s.quiz())
        .is_some_and(|gate| gate.feedback().is_some());

    if typing {
        if answered {
            return Vec::new();
        }
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                state.quiz_input.text.push(c);
            }
            KeyCode::Backspace => {
                state.quiz_input.text.pop();
            }
            _ => {}
        }
        return Vec::new();
    }

    match action {
        Some(Action::QuizUp) if choices > 0 => {
            state.quiz_input.selected = (state.quiz_input.selected + choices - 1) % choices;
            Vec::new()
        }
        Some(Action::QuizDown) if choices > 0 => {
            state.quiz_input.selected = (state.quiz_input.selected + 1) % choices;
            Vec::new()
        }
        Some(Action::Submit) => submit(state, &question),
        Some(Action::SkipQuiz) => skip(state),
        _ => Vec::new(),
    }
}

fn submit(state: &mut AppState, question: &guided_study::Question) -> Vec<TimerRequest> {
    let Some(answer) = state.quiz_input.answer(question) else {
        state.status_message = Some("Type an answer first".into());
        return Vec::new();
    };
    let Some(study) = state.study.as_mut() else {
        return Vec::new();
    };
    match study.submit_answer(answer, Instant::now()) {
        Ok((SubmitOutcome::Feedback(feedback), requests)) => {
            state.status_message = Some(feedback_message(feedback.is_correct));
            requests
        }
        Ok((SubmitOutcome::Completed { feedback, .. }, requests)) => {
            state.status_message = Some(match study.last_summary() {
                Some(summary) => format!(
                    "{} Quiz done: {}/{} correct, {} points",
                    final_feedback_message(&feedback),
                    summary.correct,
                    summary.total,
                    summary.points_earned
                ),
                None => final_feedback_message(&feedback),
            });
            state.sync_quiz_input();
            requests
        }
        Err(StudyError::QuizAwaitingAdvance) => {
            debug!("Submit ignored while feedback is shown");
            Vec::new()
        }
        Err(e) => {
            state.error_popup = Some(ErrorPopup::from_error_info(&ErrorInfo::from_study_error(
                &e,
            )));
            Vec::new()
        }
    }
}

fn skip(state: &mut AppState) -> Vec<TimerRequest> {
    let Some(study) = state.study.as_mut() else {
        return Vec::new();
    };
    match study.skip_quiz() {
        Ok(requests) => {
            state.status_message = Some("Quiz skipped".into());
            state.sync_quiz_input();
            requests
        }
        Err(StudyError::QuizAwaitingAdvance) => {
            debug!("Skip ignored while feedback is shown");
            Vec::new()
        }
        Err(e) => {
            state.error_popup = Some(ErrorPopup::from_error_info(&ErrorInfo::from_study_error(
                &e,
            )));
            Vec::new()
        }
    }
}

fn feedback_message(correct: bool) -> String {
    if correct {
        "Correct!".into()
    } else {
        "Not quite.".into()
    }
}

/// The popup closes with the last answer, so its feedback goes to the status line.
fn final_feedback_message(feedback: &Feedback) -> String {
    let mut message = feedback_message(feedback.is_correct);
    if let Some(answer) = &feedback.correct_answer {
        message.push_str(&format!(" Answer: {}.", answer));
    }
    if let (false, Some(explanation)) = (feedback.is_correct, &feedback.explanation) {
        message.push_str(&format!(" {}", explanation));
    }
    message
}
