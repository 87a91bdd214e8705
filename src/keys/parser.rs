use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::error::{Result, StudyError};

/// Accepted spellings of each named key; the label is how it is displayed.
const NAMED_KEYS: &[(&[&str], KeyCode, &str)] = &[
    (&["enter", "return"], KeyCode::Enter, "Enter"),
    (&["esc", "escape"], KeyCode::Esc, "Esc"),
    (&["tab"], KeyCode::Tab, "Tab"),
    (&["backtab"], KeyCode::BackTab, "BackTab"),
    (&["backspace", "bs"], KeyCode::Backspace, "Backspace"),
    (&["delete", "del"], KeyCode::Delete, "Delete"),
    (&["home"], KeyCode::Home, "Home"),
    (&["end"], KeyCode::End, "End"),
    (&["pageup", "pgup"], KeyCode::PageUp, "PageUp"),
    (&["pagedown", "pgdn"], KeyCode::PageDown, "PageDown"),
    (&["up", "↑"], KeyCode::Up, "↑"),
    (&["down", "↓"], KeyCode::Down, "↓"),
    (&["left", "←"], KeyCode::Left, "←"),
    (&["right", "→"], KeyCode::Right, "→"),
    (&["space"], KeyCode::Char(' '), "Space"),
];

/// Parse a binding such as `Ctrl+Enter`, `Alt+n` or `?`. Modifiers are
/// case-insensitive; single characters keep their case.
pub fn parse_key(input: &str) -> Result<KeyEvent> {
    let invalid = |why: &str| StudyError::Config(format!("Invalid key '{}': {}", input, why));

    // "Ctrl++" binds the plus key itself
    let (mods, key) = match input.strip_suffix("++") {
        Some(rest) => (rest, "+"),
        None => match input.rsplit_once('+') {
            Some((mods, key)) => (mods, key),
            None => ("", input),
        },
    };

    let mut modifiers = KeyModifiers::NONE;
    for part in mods.split('+').map(str::trim).filter(|p| !p.is_empty()) {
        modifiers |= match part.to_lowercase().as_str() {
            "ctrl" | "control" => KeyModifiers::CONTROL,
            "alt" | "meta" => KeyModifiers::ALT,
            "shift" => KeyModifiers::SHIFT,
            other => return Err(invalid(&format!("unknown modifier '{}'", other))),
        };
    }

    let key = key.trim();
    if key.is_empty() {
        return Err(invalid("no key after modifiers"));
    }
    let code = parse_key_code(key).ok_or_else(|| invalid("unknown key name"))?;
    Ok(KeyEvent::new(code, modifiers))
}

/// Display label of `code`, the inverse of [`parse_key`] for a bare key.
pub fn key_label(code: KeyCode) -> String {
    if let Some((_, _, label)) = NAMED_KEYS.iter().find(|(_, c, _)| *c == code) {
        return label.to_string();
    }
    match code {
        KeyCode::Char(c) => c.to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => "?".to_string(),
    }
}

fn parse_key_code(key: &str) -> Option<KeyCode> {
    let lower = key.to_lowercase();
    if let Some((_, code, _)) = NAMED_KEYS
        .iter()
        .find(|(names, _, _)| names.contains(&lower.as_str()))
    {
        return Some(*code);
    }
    if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
        return (1..=12).contains(&n).then_some(KeyCode::F(n));
    }
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(KeyCode::Char(c)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_character() {
        let key = parse_key("s").unwrap();
        assert_eq!(key.code, KeyCode::Char('s'));
        assert_eq!(key.modifiers, KeyModifiers::NONE);
    }

    #[test]
    fn modifiers_combine_case_insensitively() {
        let key = parse_key("ctrl+ALT+n").unwrap();
        assert_eq!(key.code, KeyCode::Char('n'));
        assert_eq!(key.modifiers, KeyModifiers::CONTROL | KeyModifiers::ALT);
    }

    #[test]
    fn character_case_is_kept() {
        assert_eq!(parse_key("N").unwrap().code, KeyCode::Char('N'));
        assert_eq!(parse_key("?").unwrap().code, KeyCode::Char('?'));
    }

    #[test]
    fn named_keys() {
        assert_eq!(parse_key("Enter").unwrap().code, KeyCode::Enter);
        assert_eq!(parse_key("escape").unwrap().code, KeyCode::Esc);
        assert_eq!(parse_key("PgDn").unwrap().code, KeyCode::PageDown);
        assert_eq!(parse_key("Space").unwrap().code, KeyCode::Char(' '));
        assert_eq!(parse_key("↑").unwrap().code, KeyCode::Up);
        assert_eq!(parse_key("Ctrl+Right").unwrap().code, KeyCode::Right);
    }

    #[test]
    fn function_keys_in_range() {
        assert_eq!(parse_key("F1").unwrap().code, KeyCode::F(1));
        assert_eq!(parse_key("f12").unwrap().code, KeyCode::F(12));
        assert!(parse_key("F13").is_err());
    }

    #[test]
    fn plus_key_after_modifier() {
        let key = parse_key("Ctrl++").unwrap();
        assert_eq!(key.code, KeyCode::Char('+'));
        assert_eq!(key.modifiers, KeyModifiers::CONTROL);
    }

    #[test]
    fn labels_parse_back_to_the_same_key() {
        let codes = [
            KeyCode::Enter,
            KeyCode::Up,
            KeyCode::Char(' '),
            KeyCode::F(5),
            KeyCode::Char('?'),
        ];
        for code in codes {
            assert_eq!(parse_key(&key_label(code)).unwrap().code, code);
        }
    }

    #[test]
    fn invalid_inputs_are_config_errors() {
        for input in ["", "Ctrl+", "Hyper+x", "banana"] {
            assert!(
                matches!(parse_key(input), Err(StudyError::Config(_))),
                "{} should fail",
                input
            );
        }
    }
}
