//! Binding in-text citation markers back to context entries

use std::sync::OnceLock;

use regex::Regex;

/// Marker pattern, compiled once per process
fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\[Source\s+(\d+)[^\]]*\]").expect("invalid citation regex"))
}

/// Check the `[Source N]` markers in generated text against the number of
/// context entries actually presented to the engine
///
/// Returns the cleaned text and the sorted, deduplicated list of validly
/// referenced citation indices. A marker whose index was never included
/// in the context block is a generation-quality issue, not a fatal error:
/// the dangling marker is stripped from the text and logged.
pub fn resolve_markers(answer: &str, available: usize) -> (String, Vec<usize>) {
    let pattern = marker_pattern();

    let mut referenced: Vec<usize> = Vec::new();
    let mut dangling = 0usize;

    let cleaned = pattern.replace_all(answer, |caps: &regex::Captures| {
        let index: usize = caps[1].parse().unwrap_or(0);
        if index >= 1 && index <= available {
            if !referenced.contains(&index) {
                referenced.push(index);
            }
            caps[0].to_string()
        } else {
            dangling += 1;
            String::new()
        }
    });

    if dangling > 0 {
        tracing::warn!(
            dangling,
            available,
            "generated text referenced citation indices outside the context block"
        );
    }

    referenced.sort_unstable();
    (cleaned.into_owned(), referenced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_markers_are_kept_and_collected() {
        let (text, referenced) =
            resolve_markers("Per [Source 1] and [Source 2], yes.", 3);
        assert_eq!(text, "Per [Source 1] and [Source 2], yes.");
        assert_eq!(referenced, vec![1, 2]);
    }

    #[test]
    fn dangling_markers_are_stripped() {
        let (text, referenced) = resolve_markers("As [Source 7] says, no.", 2);
        assert_eq!(text, "As  says, no.");
        assert!(referenced.is_empty());
    }

    #[test]
    fn repeated_markers_dedup() {
        let (_, referenced) = resolve_markers("[Source 2] then [Source 2] again", 2);
        assert_eq!(referenced, vec![2]);
    }

    #[test]
    fn markers_with_extra_metadata_resolve_by_index() {
        let (text, referenced) = resolve_markers("See [Source 1, Page 4].", 1);
        assert_eq!(text, "See [Source 1, Page 4].");
        assert_eq!(referenced, vec![1]);
    }

    #[test]
    fn zero_index_is_dangling() {
        let (text, referenced) = resolve_markers("[Source 0] claims", 3);
        assert_eq!(text, " claims");
        assert!(referenced.is_empty());
    }

    #[test]
    fn text_without_markers_passes_through() {
        let (text, referenced) = resolve_markers("plain answer", 5);
        assert_eq!(text, "plain answer");
        assert!(referenced.is_empty());
    }

    #[test]
    fn repeated_calls_reuse_the_compiled_pattern() {
        let first = marker_pattern() as *const Regex;
        resolve_markers("[Source 1] once", 1);
        resolve_markers("[Source 1] twice", 1);
        let second = marker_pattern() as *const Regex;
        assert_eq!(first, second);
    }
}
