use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Where a key is read: the document view, or the open quiz popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyContext {
    Reader,
    Quiz,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    ToggleStudy,
    MarkComplete,
    NextSection,
    ToggleReadOnly,
    ToggleMode,
    ScrollUp,
    ScrollDown,
    QuizUp,
    QuizDown,
    Submit,
    SkipQuiz,
    Help,
    Quit,
}

impl Action {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "toggle_study" => Some(Self::ToggleStudy),
            "mark_complete" => Some(Self::MarkComplete),
            "next_section" => Some(Self::NextSection),
            "toggle_read_only" => Some(Self::ToggleReadOnly),
            "toggle_mode" => Some(Self::ToggleMode),
            "scroll_up" => Some(Self::ScrollUp),
            "scroll_down" => Some(Self::ScrollDown),
            "quiz_up" => Some(Self::QuizUp),
            "quiz_down" => Some(Self::QuizDown),
            "submit" => Some(Self::Submit),
            "skip_quiz" => Some(Self::SkipQuiz),
            "help" => Some(Self::Help),
            "quit" => Some(Self::Quit),
            _ => None,
        }
    }

    pub fn hint_text(&self) -> &'static str {
        match self {
            Self::ToggleStudy => "study",
            Self::MarkComplete => "done",
            Self::NextSection => "next",
            Self::ToggleReadOnly => "read-only",
            Self::ToggleMode => "mode",
            Self::ScrollUp => "up",
            Self::ScrollDown => "down",
            Self::QuizUp => "prev option",
            Self::QuizDown => "next option",
            Self::Submit => "submit",
            Self::SkipQuiz => "skip",
            Self::Help => "help",
            Self::Quit => "quit",
        }
    }

    pub fn context(&self) -> KeyContext {
        match self {
            Self::QuizUp | Self::QuizDown | Self::Submit | Self::SkipQuiz => KeyContext::Quiz,
            _ => KeyContext::Reader,
        }
    }
}

pub type Bindings = HashMap<(KeyContext, KeyEvent), Action>;

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn ctrl(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::CONTROL)
}

fn alt(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::ALT)
}

fn bind(m: &mut Bindings, key: KeyEvent, action: Action) {
    m.insert((action.context(), key), action);
}

pub fn vim_preset() -> Bindings {
    let mut m = HashMap::new();
    bind(&mut m, key(KeyCode::Char('k')), Action::ScrollUp);
    bind(&mut m, key(KeyCode::Up), Action::ScrollUp);
    bind(&mut m, key(KeyCode::Char('j')), Action::ScrollDown);
    bind(&mut m, key(KeyCode::Down), Action::ScrollDown);
    bind(&mut m, key(KeyCode::Char('s')), Action::ToggleStudy);
    bind(&mut m, key(KeyCode::Enter), Action::MarkComplete);
    bind(&mut m, key(KeyCode::Char('c')), Action::MarkComplete);
    bind(&mut m, key(KeyCode::Char('n')), Action::NextSection);
    bind(&mut m, key(KeyCode::Char('r')), Action::ToggleReadOnly);
    bind(&mut m, key(KeyCode::Char('m')), Action::ToggleMode);
    bind(&mut m, key(KeyCode::Char('?')), Action::Help);
    bind(&mut m, key(KeyCode::Char('q')), Action::Quit);
    bind(&mut m, key(KeyCode::Char('k')), Action::QuizUp);
    bind(&mut m, key(KeyCode::Up), Action::QuizUp);
    bind(&mut m, key(KeyCode::Char('j')), Action::QuizDown);
    bind(&mut m, key(KeyCode::Down), Action::QuizDown);
    bind(&mut m, key(KeyCode::Enter), Action::Submit);
    bind(&mut m, key(KeyCode::Esc), Action::SkipQuiz);
    m
}

pub fn emacs_preset() -> Bindings {
    let mut m = HashMap::new();
    bind(&mut m, ctrl(KeyCode::Char('p')), Action::ScrollUp);
    bind(&mut m, key(KeyCode::Up), Action::ScrollUp);
    bind(&mut m, ctrl(KeyCode::Char('n')), Action::ScrollDown);
    bind(&mut m, key(KeyCode::Down), Action::ScrollDown);
    bind(&mut m, alt(KeyCode::Char('s')), Action::ToggleStudy);
    bind(&mut m, key(KeyCode::Enter), Action::MarkComplete);
    bind(&mut m, alt(KeyCode::Char('n')), Action::NextSection);
    bind(&mut m, alt(KeyCode::Char('r')), Action::ToggleReadOnly);
    bind(&mut m, alt(KeyCode::Char('m')), Action::ToggleMode);
    bind(&mut m, ctrl(KeyCode::Char('h')), Action::Help);
    bind(&mut m, ctrl(KeyCode::Char('q')), Action::Quit);
    bind(&mut m, ctrl(KeyCode::Char('p')), Action::QuizUp);
    bind(&mut m, key(KeyCode::Up), Action::QuizUp);
    bind(&mut m, ctrl(KeyCode::Char('n')), Action::QuizDown);
    bind(&mut m, key(KeyCode::Down), Action::QuizDown);
    bind(&mut m, key(KeyCode::Enter), Action::Submit);
    bind(&mut m, ctrl(KeyCode::Char('g')), Action::SkipQuiz);
    m
}

pub fn vscode_preset() -> Bindings {
    let mut m = HashMap::new();
    bind(&mut m, key(KeyCode::Up), Action::ScrollUp);
    bind(&mut m, key(KeyCode::Down), Action::ScrollDown);
    bind(&mut m, key(KeyCode::PageUp), Action::ScrollUp);
    bind(&mut m, key(KeyCode::PageDown), Action::ScrollDown);
    bind(&mut m, ctrl(KeyCode::Char('s')), Action::ToggleStudy);
    bind(&mut m, ctrl(KeyCode::Enter), Action::MarkComplete);
    bind(&mut m, ctrl(KeyCode::Right), Action::NextSection);
    bind(&mut m, ctrl(KeyCode::Char('r')), Action::ToggleReadOnly);
    bind(&mut m, alt(KeyCode::Char('m')), Action::ToggleMode);
    bind(&mut m, key(KeyCode::F(1)), Action::Help);
    bind(&mut m, ctrl(KeyCode::Char('q')), Action::Quit);
    bind(&mut m, key(KeyCode::Up), Action::QuizUp);
    bind(&mut m, key(KeyCode::Down), Action::QuizDown);
    bind(&mut m, key(KeyCode::Enter), Action::Submit);
    bind(&mut m, key(KeyCode::Esc), Action::SkipQuiz);
    m
}

pub fn get_preset(name: &str) -> Option<Bindings> {
    match name.to_lowercase().as_str() {
        "vim" => Some(vim_preset()),
        "emacs" => Some(emacs_preset()),
        "vscode" => Some(vscode_preset()),
        _ => None,
    }
}
