use serde_json::Value;
use tracing::{debug, instrument, trace};

const FENCE: &str = "```";

/// Locate a fenced code block holding a JSON object and return the object text.
///
/// Matches a fence, an optional `json` tag, optional whitespace, then the shortest
/// `{...}` that is followed by optional whitespace and a closing fence. Fences are
/// tried left to right; the first one that yields a match wins.
#[instrument(target = "tutorbot::json", skip(text), fields(text_len = text.len()))]
pub fn find_fenced_object(text: &str) -> Option<&str> {
    let mut search_from = 0usize;
    while let Some(rel) = text[search_from..].find(FENCE) {
        let fence_start = search_from + rel;
        if let Some(found) = object_after_fence(text, fence_start + FENCE.len()) {
            trace!(target: "tutorbot::json", fence_start, "fenced object found");
            return Some(found);
        }
        // Advance by one char so overlapping fences (```` ```` ````) are tried too.
        search_from = fence_start + 1;
    }
    None
}

fn object_after_fence(text: &str, after_fence: usize) -> Option<&str> {
    let mut pos = after_fence;
    if text[pos..].starts_with("json") {
        pos += "json".len();
    }
    pos = skip_whitespace(text, pos);
    if !text[pos..].starts_with('{') {
        return None;
    }
    let open = pos;
    for (rel, ch) in text[open..].char_indices() {
        if ch != '}' {
            continue;
        }
        let close = open + rel;
        let after = skip_whitespace(text, close + 1);
        if text[after..].starts_with(FENCE) {
            return Some(&text[open..=close]);
        }
    }
    None
}

fn skip_whitespace(text: &str, from: usize) -> usize {
    text[from..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}

/// Greedy brace span: from the first `{` to the last `}` after it.
///
/// Nested or repeated objects are not told apart; two objects in one reply come back
/// as a single span covering both.
pub fn greedy_brace_span(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let close = text.rfind('}')?;
    if close < open {
        return None;
    }
    Some(&text[open..=close])
}

/// Parse `candidate` strictly, then once more with single quotes turned into double
/// quotes. Each parsed value is handed to `accept`; the first accepted result wins.
pub fn parse_with_quote_repair<T>(candidate: &str, mut accept: impl FnMut(Value) -> Option<T>) -> Option<T> {
    let repaired = candidate.replace('\'', "\"");
    for (attempt, text) in [candidate, repaired.as_str()].into_iter().enumerate() {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => {
                if let Some(out) = accept(value) {
                    debug!(target: "tutorbot::json", attempt, "candidate accepted");
                    return Some(out);
                }
                debug!(target: "tutorbot::json", attempt, "candidate parsed but rejected");
            }
            Err(e) => debug!(target: "tutorbot::json", attempt, error = %e, "candidate did not parse"),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_object_with_tag() {
        let text = "Here:\n```json\n{\"a\": {\"b\": 1}}\n```\nbye";
        assert_eq!(find_fenced_object(text), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn fenced_object_without_tag() {
        let text = "```\n  {\"a\": 1}  ```";
        assert_eq!(find_fenced_object(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn fence_without_object_is_skipped() {
        let text = "```rust\nfn main() {}\n```\n";
        assert_eq!(find_fenced_object(text), None);
    }

    #[test]
    fn greedy_span_covers_multiple_objects() {
        let text = "x {\"a\":1} y {\"b\":2} z";
        assert_eq!(greedy_brace_span(text), Some("{\"a\":1} y {\"b\":2}"));
    }

    #[test]
    fn greedy_span_requires_closing_after_open() {
        assert_eq!(greedy_brace_span("} then {"), None);
        assert_eq!(greedy_brace_span("no braces"), None);
    }
}
