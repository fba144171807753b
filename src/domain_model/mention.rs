use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.+\-]+@[\w.\-]+\.\w+").expect("mention pattern"));

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z0-9_\-.+]+)@([a-zA-Z0-9_\-.]+)\.([a-zA-Z]{2,})$").expect("email pattern")
});

/// Email addresses mentioned in free text, normalized, in order of first appearance.
pub fn extract_mentions(text: &str) -> Vec<String> {
    dedup_preserving_order(MENTION.find_iter(text).map(|m| normalize_email(m.as_str())))
}

/// Addresses compare case-insensitively; this is the one spelling stored and looked up.
pub fn normalize_email(email: &str) -> String {
    email.to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

pub fn dedup_preserving_order<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_mentions_in_order() {
        let text = "hi bob@example.com, ping carol.c@mail.example.org and bob@example.com again";

        assert_eq!(
            extract_mentions(text),
            vec!["bob@example.com", "carol.c@mail.example.org"]
        );
    }

    #[test]
    fn text_without_addresses_has_no_mentions() {
        assert!(extract_mentions("hello @everyone, see you at 5").is_empty());
    }

    #[test]
    fn plus_addresses_are_mentioned_whole() {
        let text = "hi carol+work@example.com and dave@example.com";

        let mentions = extract_mentions(text);

        assert_eq!(mentions, vec!["carol+work@example.com", "dave@example.com"]);
        assert!(mentions.iter().all(|m| is_valid_email(m)));
    }

    #[test]
    fn mentions_are_normalized() {
        assert_eq!(
            extract_mentions("ping Bob@Example.COM and bob@example.com"),
            vec!["bob@example.com"]
        );
        assert_eq!(normalize_email("Alice@Example.com"), "alice@example.com");
    }

    #[test]
    fn validates_email_shape() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b-c+d@sub.example.io"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email(" alice@example.com"));
    }
}
