pub mod parser;
pub mod preset;

use std::collections::HashMap;

use crossterm::event::KeyEvent;

use crate::error::{Result, StudyError};
use preset::{get_preset, Action, Bindings, KeyContext};

pub struct KeybindingMap {
    bindings: Bindings,
}

impl KeybindingMap {
    pub fn from_preset(name: &str, overrides: &HashMap<String, String>) -> Result<Self> {
        let mut bindings = get_preset(name)
            .ok_or_else(|| StudyError::Config(format!("Unknown keybinding preset: {}", name)))?;

        for (action_name, key_str) in overrides {
            let action = Action::from_str(action_name)
                .ok_or_else(|| StudyError::Config(format!("Unknown action: {}", action_name)))?;
            let key_event = parser::parse_key(key_str)?;

            bindings.retain(|_, v| v != &action);
            bindings.insert((action.context(), key_event), action);
        }

        Ok(Self { bindings })
    }

    pub fn resolve(&self, context: KeyContext, key: &KeyEvent) -> Option<&Action> {
        self.bindings.get(&(context, *key))
    }

    pub fn hints(&self, context: KeyContext) -> Vec<(String, &'static str)> {
        let important: &[Action] = match context {
            KeyContext::Reader => &[
                Action::Quit,
                Action::ToggleStudy,
                Action::MarkComplete,
                Action::NextSection,
                Action::Help,
            ],
            KeyContext::Quiz => &[
                Action::QuizUp,
                Action::QuizDown,
                Action::Submit,
                Action::SkipQuiz,
            ],
        };

        let mut hints = Vec::new();
        for action in important {
            // several keys may share an action; pick a stable one
            let key_event = self
                .bindings
                .iter()
                .filter(|((ctx, _), a)| *ctx == context && *a == action)
                .map(|((_, k), _)| format_key_event(k))
                .min_by_key(|label| (label.chars().count(), label.clone()));
            if let Some(label) = key_event {
                hints.push((label, action.hint_text()));
            }
        }
        hints
    }
}

/// Label such as `Ctrl+Alt+n`, in the order the parser accepts.
pub fn format_key_event(key: &KeyEvent) -> String {
    use crossterm::event::KeyModifiers;

    const MODIFIERS: [(KeyModifiers, &str); 3] = [
        (KeyModifiers::CONTROL, "Ctrl"),
        (KeyModifiers::ALT, "Alt"),
        (KeyModifiers::SHIFT, "Shift"),
    ];
    let mut label: String = MODIFIERS
        .iter()
        .filter(|(m, _)| key.modifiers.contains(*m))
        .map(|(_, name)| format!("{}+", name))
        .collect();
    label.push_str(&parser::key_label(key.code));
    label
}
