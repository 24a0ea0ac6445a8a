/// Escapes markup-significant characters, then truncates to `max_chars` characters.
///
/// `&` is escaped first so the entities produced for `<` and `>` stay intact.
pub fn sanitize(text: &str, max_chars: usize) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .chars()
        .take(max_chars)
        .collect()
}

/// Display name for a joining player; blank input becomes `default`.
pub fn sanitize_name(raw: &str, max_chars: usize, default: &str) -> String {
    let name = sanitize(raw, max_chars);
    if name.is_empty() {
        sanitize(default, max_chars)
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_script_tags() {
        assert_eq!(sanitize("<script>", 200), "&lt;script&gt;");
        assert_eq!(sanitize("a & b", 200), "a &amp; b");
    }

    #[test]
    fn truncates_by_characters_not_bytes() {
        assert_eq!(sanitize("オセロオセロ", 3), "オセロ");
        assert_eq!(sanitize(&"x".repeat(250), 200).len(), 200);
    }

    #[test]
    fn empty_name_falls_back_to_default() {
        assert_eq!(sanitize_name("", 20, "Guest"), "Guest");
        assert_eq!(sanitize_name("Alice", 20, "Guest"), "Alice");
        assert_eq!(
            sanitize_name("abcdefghijklmnopqrstuvwxyz", 20, "Guest"),
            "abcdefghijklmnopqrst"
        );
        assert_eq!(sanitize_name("<b>", 20, "Guest"), "&lt;b&gt;");
    }
}
