//! Utility functions for Chatline.

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Works on character boundaries, so emoji and other multi-byte text are safe.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            let truncated = &s[..idx];
            format!("{}...", truncated.trim_end())
        }
        None => s.to_string(),
    }
}

/// Mask all but the last four characters of a phone-style address.
///
/// `whatsapp:+15551234567` becomes `whatsapp:********4567`.
pub fn mask_address(address: &str) -> String {
    let (prefix, number) = match address.split_once(':') {
        Some((scheme, rest)) => (format!("{scheme}:"), rest),
        None => (String::new(), address),
    };

    let count = number.chars().count();
    if count <= 4 {
        return address.to_string();
    }

    let visible: String = number.chars().skip(count - 4).collect();
    format!("{prefix}{}{visible}", "*".repeat(count - 4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
        assert_eq!(truncate_with_ellipsis("hello world", 5), "hello...");
        assert_eq!(truncate_with_ellipsis("😀😀😀😀", 2), "😀😀...");
        assert_eq!(truncate_with_ellipsis("", 10), "");
    }

    #[test]
    fn test_mask_address() {
        assert_eq!(mask_address("whatsapp:+15551234567"), "whatsapp:********4567");
        assert_eq!(mask_address("+15551234567"), "********4567");
        assert_eq!(mask_address("1234"), "1234");
        assert_eq!(mask_address(""), "");
    }
}
