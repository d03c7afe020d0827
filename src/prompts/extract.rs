// Candidate extraction from free-form completion text
//
// Best effort, not a markdown parser: prefer a python-tagged fence, then any
// fence, then the whole response.

const FENCE: &str = "```";

/// Fence info strings treated as Python, longest first so "python3" is not
/// read as "python" followed by a stray "3".
const PYTHON_TAGS: [&str; 3] = ["python3", "python", "py"];

/// Pull candidate source out of a model response.
pub fn extract_code(response: &str) -> String {
    if let Some(body) = python_fence_body(response) {
        return body.trim().to_string();
    }

    if let Some(body) = any_fence_body(response) {
        return body.trim().to_string();
    }

    response.trim().to_string()
}

/// Body of the first fence whose info string is a Python tag
fn python_fence_body(text: &str) -> Option<&str> {
    for (open, _) in text.match_indices(FENCE) {
        let after = &text[open + FENCE.len()..];
        for tag in PYTHON_TAGS {
            if let Some(rest) = after.strip_prefix(tag) {
                if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                    let body_start = open + FENCE.len() + tag.len();
                    return closing_fence(text, body_start);
                }
            }
        }
    }
    None
}

/// Body of the first fence of any kind, minus its info string
fn any_fence_body(text: &str) -> Option<&str> {
    let open = text.find(FENCE)?;
    let body = closing_fence(text, open + FENCE.len())?;
    Some(strip_info_string(body))
}

fn closing_fence(text: &str, body_start: usize) -> Option<&str> {
    let len = text[body_start..].find(FENCE)?;
    Some(&text[body_start..body_start + len])
}

/// "bash\nls -la\n" -> "ls -la\n". A first line that isn't a bare word is
/// kept, since it is code.
fn strip_info_string(body: &str) -> &str {
    match body.split_once('\n') {
        Some((first, rest))
            if !first.trim().is_empty()
                && first
                    .trim()
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_' | '.')) =>
        {
            rest
        }
        _ => body,
    }
}
