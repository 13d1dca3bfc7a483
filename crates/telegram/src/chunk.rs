//! Splitting of outbound text into Bot API sized messages.

/// Bot API limit for a single message text, in bytes of UTF-8.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

/// Split `text` into pieces of at most `max_len` bytes, preferring line
/// breaks, then spaces, and never cutting through a character.
pub fn chunk_message(text: &str, max_len: usize) -> Vec<String> {
    if max_len == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.len() > max_len {
        let mut window = max_len;
        while window > 0 && !rest.is_char_boundary(window) {
            window -= 1;
        }
        if window == 0 {
            window = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let head = &rest[..window];
        let cut = head
            .rfind('\n')
            .or_else(|| head.rfind(' '))
            .filter(|at| *at > 0)
            .unwrap_or(window);

        chunks.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start_matches('\n');
        rest = rest.strip_prefix(' ').unwrap_or(rest);
    }
    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(chunk_message("hello", 100), vec!["hello"]);
        assert_eq!(chunk_message("", 100), vec![""]);
    }

    #[test]
    fn prefers_newlines_then_spaces() {
        assert_eq!(chunk_message("line one\nline two", 10), vec![
            "line one", "line two"
        ]);
        assert_eq!(chunk_message("aaaa bbbb cccc", 10), vec!["aaaa bbbb", "cccc"]);
    }

    #[test]
    fn hard_splits_unbroken_text() {
        assert_eq!(chunk_message("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn never_splits_inside_a_character() {
        let text = "আ".repeat(3000);
        let chunks = chunk_message(&text, TELEGRAM_MAX_MESSAGE_LEN);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= TELEGRAM_MAX_MESSAGE_LEN));
        assert_eq!(chunks.concat(), text);
    }
}
