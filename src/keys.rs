use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const CONTROL_PREFIX: &str = "C+";
const ALT_PREFIX: &str = "A+";
const SUPER_PREFIX: &str = "S+";
const META_PREFIX: &str = "M+";

/// Renders a terminal key event in the bridge's string form: a modifier
/// prefix (`"C+"`, `"A+"`, ...) followed by the key token (`"a"`, `"Enter"`,
/// `"Backspace"`, ...). Returns `None` for events the bridge does not carry
/// (media keys, bare modifiers).
pub fn key_event_string(event: &KeyEvent) -> Option<String> {
    let key = match event.code {
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::BackTab => "BackTab".to_string(),
        KeyCode::Delete => "Delete".to_string(),
        KeyCode::Insert => "Insert".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::F(index) => format!("F{}", index),
        KeyCode::Char(c) => {
            if event.modifiers.contains(KeyModifiers::SHIFT) {
                c.to_ascii_uppercase().to_string()
            } else {
                c.to_string()
            }
        }
        _ => return None,
    };

    let mut out = String::new();
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        out.push_str(CONTROL_PREFIX);
    }
    if event.modifiers.contains(KeyModifiers::ALT) {
        out.push_str(ALT_PREFIX);
    }
    if event.modifiers.contains(KeyModifiers::SUPER) {
        out.push_str(SUPER_PREFIX);
    }
    if event.modifiers.contains(KeyModifiers::META) {
        out.push_str(META_PREFIX);
    }
    out.push_str(&key);
    Some(out)
}

/// The text a key inserts when it reaches an unmapped leaf of the keymap,
/// or `None` for keys with no text of their own. `Tab` is not handled
/// here: its expansion depends on the editor options, so the key handler
/// resolves it over the bridge.
pub fn text_for_key(key: &str) -> Option<String> {
    if key == "Enter" {
        return Some("\n".to_string());
    }
    if key.contains('+') {
        return None;
    }
    let mut chars = key.chars();
    let only = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    (!only.is_control()).then(|| only.to_string())
}
