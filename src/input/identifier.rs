use regex::Regex;
use std::sync::OnceLock;

/// Length of a canonical ObjectId hex string
pub const OBJECT_ID_LEN: usize = 24;

/// Previews longer than this are truncated
const PREVIEW_MAX_CHARS: usize = 120;
const PREVIEW_KEEP_CHARS: usize = 117;

fn bare_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-fA-F]{24}$").expect("valid regex"))
}

fn call_pattern() -> &'static Regex {
    // ObjectId("...") or ObjectId('...'); the wrapper name is case-insensitive
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)ObjectId\(\s*(?:"([0-9a-f]{24})"|'([0-9a-f]{24})')\s*\)"#)
            .expect("valid regex")
    })
}

fn oid_property_pattern() -> &'static Regex {
    // {"$oid": "..."} as printed by extended JSON
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""?\$oid"?\s*:\s*["']([0-9a-fA-F]{24})["']"#).expect("valid regex")
    })
}

/// Extract a 24-hex ObjectId from arbitrary text.
///
/// Patterns are tried in order and the first hit wins:
/// 1. the whole (trimmed) text is a 24-hex string
/// 2. a call-style wrapper such as `ObjectId("...")`
/// 3. an extended-JSON `"$oid": "..."` pair
///
/// The identifier is returned exactly as it appeared in the text.
pub fn extract_object_id(text: &str) -> Option<String> {
    let plain = text.trim();
    if plain.is_empty() {
        return None;
    }

    if bare_pattern().is_match(plain) {
        return Some(plain.to_string());
    }

    if let Some(caps) = call_pattern().captures(plain) {
        if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
            return Some(m.as_str().to_string());
        }
    }

    oid_property_pattern()
        .captures(plain)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// First line of `text`, trimmed and shortened for status messages.
pub fn first_line_preview(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    let first = normalized.split('\n').next().unwrap_or("").trim();

    if first.chars().count() > PREVIEW_MAX_CHARS {
        let kept: String = first.chars().take(PREVIEW_KEEP_CHARS).collect();
        format!("{}…", kept)
    } else {
        first.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "507f1f77bcf86cd799439011";

    #[test]
    fn test_bare_identifier() {
        assert_eq!(extract_object_id(ID).as_deref(), Some(ID));
        assert_eq!(
            extract_object_id("  507F1F77BCF86CD799439011\n").as_deref(),
            Some("507F1F77BCF86CD799439011")
        );
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let once = extract_object_id(ID).unwrap();
        let twice = extract_object_id(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_call_wrapper() {
        let text = format!("db.users.find({{_id: ObjectId(\"{}\")}})", ID);
        assert_eq!(extract_object_id(&text).as_deref(), Some(ID));

        let single = format!("objectid('{}')", ID);
        assert_eq!(extract_object_id(&single).as_deref(), Some(ID));
    }

    #[test]
    fn test_mismatched_quotes_are_rejected() {
        let text = format!("ObjectId(\"{}')", ID);
        assert_eq!(extract_object_id(&text), None);
    }

    #[test]
    fn test_oid_property() {
        let text = format!("{{ \"_id\": {{ \"$oid\": \"{}\" }} }}", ID);
        assert_eq!(extract_object_id(&text).as_deref(), Some(ID));
    }

    #[test]
    fn test_no_identifier() {
        assert_eq!(extract_object_id(""), None);
        assert_eq!(extract_object_id("hello world"), None);
        assert_eq!(extract_object_id("507f1f77bcf86cd79943901"), None);
        assert_eq!(extract_object_id("507f1f77bcf86cd799439011ab"), None);
        assert_eq!(extract_object_id("zz7f1f77bcf86cd799439011"), None);
    }

    #[test]
    fn test_first_line_preview() {
        assert_eq!(first_line_preview("  abc  \r\nsecond"), "abc");
        assert_eq!(first_line_preview(""), "");

        let long = "x".repeat(130);
        let preview = first_line_preview(&long);
        assert_eq!(preview.chars().count(), 118);
        assert!(preview.ends_with('…'));

        let exact = "y".repeat(120);
        assert_eq!(first_line_preview(&exact), exact);
    }
}
