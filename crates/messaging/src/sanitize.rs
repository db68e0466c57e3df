//! Chat-name sanitation for Teams topic restrictions.

/// Placeholder when a title sanitizes down to nothing usable.
pub const DEFAULT_CHAT_NAME: &str = "New Chat";

/// Characters Teams rejects in a chat topic.
const INVALID_CHARS: &[char] = &[
    '<', '>', '*', '%', '&', ':', '{', '}', '?', '+', '/', '\\', '|', '"', '#',
];

const MAX_NAME_CHARS: usize = 250;

/// Turn an issue title into a valid chat name: trim, replace forbidden
/// characters with `-`, collapse whitespace runs, cap at 250 characters
/// with an ellipsis marker. Titles that reduce to nothing but replacement
/// dashes fall back to the placeholder.
pub fn sanitize_chat_name(title: &str) -> String {
    let replaced: String = title
        .trim()
        .chars()
        .map(|c| if INVALID_CHARS.contains(&c) { '-' } else { c })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut name = if collapsed.chars().count() > MAX_NAME_CHARS {
        let head: String = collapsed.chars().take(MAX_NAME_CHARS - 3).collect();
        format!("{head}...")
    } else {
        collapsed
    };

    if name.chars().all(|c| c == '-' || c == ' ') {
        name = DEFAULT_CHAT_NAME.to_string();
    }

    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_clean_titles_through() {
        assert_eq!(sanitize_chat_name("Bug 123"), "Bug 123");
    }

    #[test]
    fn replaces_every_forbidden_character() {
        let sanitized = sanitize_chat_name(r#"a<b>c*d%e&f:g{h}i?j+k/l\m|n"o#p"#);
        for c in INVALID_CHARS {
            assert!(!sanitized.contains(*c), "found forbidden {c:?}");
        }
        assert_eq!(sanitized, "a-b-c-d-e-f-g-h-i-j-k-l-m-n-o-p");
    }

    #[test]
    fn collapses_whitespace_and_trims() {
        assert_eq!(sanitize_chat_name("  fix   the \t bug \n"), "fix the bug");
    }

    #[test]
    fn truncates_to_250_characters_with_ellipsis() {
        let long = "x".repeat(400);
        let sanitized = sanitize_chat_name(&long);
        assert_eq!(sanitized.chars().count(), 250);
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn exactly_250_characters_is_untouched() {
        let exact = "y".repeat(250);
        assert_eq!(sanitize_chat_name(&exact), exact);
    }

    #[test]
    fn empty_and_all_invalid_input_yield_placeholder() {
        assert_eq!(sanitize_chat_name(""), DEFAULT_CHAT_NAME);
        assert_eq!(sanitize_chat_name("   \t  "), DEFAULT_CHAT_NAME);
        assert_eq!(sanitize_chat_name("###???///"), DEFAULT_CHAT_NAME);
        assert_eq!(sanitize_chat_name(" <> {} "), DEFAULT_CHAT_NAME);
    }

    #[test]
    fn never_leaves_double_spaces() {
        let sanitized = sanitize_chat_name("a / b // c");
        assert!(!sanitized.contains("  "));
        assert_eq!(sanitized, "a - b -- c");
    }
}
