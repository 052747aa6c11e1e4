//! Encoding of key presses into the bytes a terminal program expects.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Convert a key event to bytes to send to the PTY.
///
/// Keys with no terminal encoding yield an empty vector.
#[must_use]
pub fn key_to_bytes(key: KeyEvent) -> Vec<u8> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    let mut bytes = match key.code {
        KeyCode::Char(c) if ctrl => control_char(c).map(|b| vec![b]).unwrap_or_default(),
        KeyCode::Char(c) => c.to_string().into_bytes(),
        KeyCode::Enter => vec![b'\r'],
        KeyCode::Tab => vec![b'\t'],
        KeyCode::BackTab => b"\x1b[Z".to_vec(),
        KeyCode::Backspace => vec![0x7f],
        KeyCode::Esc => vec![0x1b],
        KeyCode::Up => b"\x1b[A".to_vec(),
        KeyCode::Down => b"\x1b[B".to_vec(),
        KeyCode::Right => b"\x1b[C".to_vec(),
        KeyCode::Left => b"\x1b[D".to_vec(),
        KeyCode::Home => b"\x1b[H".to_vec(),
        KeyCode::End => b"\x1b[F".to_vec(),
        KeyCode::PageUp => b"\x1b[5~".to_vec(),
        KeyCode::PageDown => b"\x1b[6~".to_vec(),
        KeyCode::Delete => b"\x1b[3~".to_vec(),
        KeyCode::Insert => b"\x1b[2~".to_vec(),
        KeyCode::F(n) => function_key(n),
        _ => Vec::new(),
    };

    // Alt sends ESC prefix
    if alt && !bytes.is_empty() {
        bytes.insert(0, 0x1b);
    }
    bytes
}

/// Control character for Ctrl+`c` (Ctrl+A = 0x01, etc.).
fn control_char(c: char) -> Option<u8> {
    match c.to_ascii_lowercase() {
        c @ 'a'..='z' => Some(c as u8 - b'a' + 1),
        '@' | ' ' | '2' => Some(0x00),
        '[' | '3' => Some(0x1b),
        '\\' | '4' => Some(0x1c),
        ']' | '5' => Some(0x1d),
        '^' | '6' => Some(0x1e),
        '_' | '7' | '-' => Some(0x1f),
        '8' | '?' => Some(0x7f),
        _ => None,
    }
}

fn function_key(n: u8) -> Vec<u8> {
    let seq: &[u8] = match n {
        1 => b"\x1bOP",
        2 => b"\x1bOQ",
        3 => b"\x1bOR",
        4 => b"\x1bOS",
        5 => b"\x1b[15~",
        6 => b"\x1b[17~",
        7 => b"\x1b[18~",
        8 => b"\x1b[19~",
        9 => b"\x1b[20~",
        10 => b"\x1b[21~",
        11 => b"\x1b[23~",
        12 => b"\x1b[24~",
        _ => b"",
    };
    seq.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn plain_characters_are_utf8() {
        assert_eq!(key_to_bytes(key(KeyCode::Char('a'), KeyModifiers::NONE)), b"a");
        assert_eq!(
            key_to_bytes(key(KeyCode::Char('é'), KeyModifiers::SHIFT)),
            "é".as_bytes()
        );
        assert_eq!(key_to_bytes(key(KeyCode::Enter, KeyModifiers::NONE)), b"\r");
    }

    #[test]
    fn control_characters() {
        assert_eq!(key_to_bytes(key(KeyCode::Char('c'), KeyModifiers::CONTROL)), vec![0x03]);
        assert_eq!(key_to_bytes(key(KeyCode::Char('A'), KeyModifiers::CONTROL)), vec![0x01]);
        assert_eq!(key_to_bytes(key(KeyCode::Char(' '), KeyModifiers::CONTROL)), vec![0x00]);
        assert_eq!(key_to_bytes(key(KeyCode::Char('\\'), KeyModifiers::CONTROL)), vec![0x1c]);
        assert!(key_to_bytes(key(KeyCode::Char('!'), KeyModifiers::CONTROL)).is_empty());
    }

    #[test]
    fn alt_prefixes_escape() {
        assert_eq!(key_to_bytes(key(KeyCode::Char('x'), KeyModifiers::ALT)), b"\x1bx");
        assert_eq!(key_to_bytes(key(KeyCode::Char('é'), KeyModifiers::ALT)), "\x1bé".as_bytes());
        assert_eq!(
            key_to_bytes(key(KeyCode::Char('b'), KeyModifiers::ALT | KeyModifiers::CONTROL)),
            vec![0x1b, 0x02]
        );
    }

    #[test]
    fn navigation_and_function_keys() {
        assert_eq!(key_to_bytes(key(KeyCode::Up, KeyModifiers::NONE)), b"\x1b[A");
        assert_eq!(key_to_bytes(key(KeyCode::PageDown, KeyModifiers::NONE)), b"\x1b[6~");
        assert_eq!(key_to_bytes(key(KeyCode::F(1), KeyModifiers::NONE)), b"\x1bOP");
        assert_eq!(key_to_bytes(key(KeyCode::F(12), KeyModifiers::NONE)), b"\x1b[24~");
        assert!(key_to_bytes(key(KeyCode::F(20), KeyModifiers::NONE)).is_empty());
    }
}
