use tracing::warn;

/// Marker the generation backend is instructed to emit when its output was
/// cut off and a follow-up call will continue the document.
pub const CONTINUATION_MARKER: &str = "<<CONTINUAR>>";

/// Reference tail of a response: everything after the last continuation
/// marker if one is present, otherwise the last sentence (up to and
/// including its `.`/`?`/`!` terminator), otherwise the whole trimmed text.
pub fn final_segment(text: &str) -> &str {
    if let Some(idx) = text.rfind(CONTINUATION_MARKER) {
        return text[idx + CONTINUATION_MARKER.len()..].trim();
    }
    if let Some(end) = text.rfind(['.', '?', '!']) {
        let start = text[..end]
            .rfind(['.', '?', '!'])
            .map(|i| i + 1)
            .unwrap_or(0);
        return text[start..=end].trim();
    }
    text.trim()
}

/// Length of the longest suffix-of-`a` / prefix-of-`b` token match, measured
/// as the character length of the matching span rendered with single spaces.
/// 0 means no overlap, which is a common and valid outcome.
pub fn overlap_len(a: &str, b: &str) -> usize {
    let tokens_a: Vec<&str> = a.split_whitespace().collect();
    let tokens_b: Vec<&str> = b.split_whitespace().collect();
    let max = tokens_a.len().min(tokens_b.len());
    for i in (1..=max).rev() {
        let tail_a = tokens_a[tokens_a.len() - i..].join(" ");
        let head_b = tokens_b[..i].join(" ");
        if tail_a == head_b {
            return head_b.chars().count();
        }
    }
    0
}

/// Drop the first `n` characters of `s`, staying on UTF-8 boundaries
fn strip_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[idx..],
        None => "",
    }
}

/// Fuse two adjacent responses into one document: strip the continuation
/// marker from the first, drop the text the second repeats (checked against
/// the reference tail first, then against the whole first part), and join
/// with a separator matched to how the first part ends.
///
/// Never fails. If the result still carries a marker or a detectable
/// overlap, that inconsistency is logged and the best-effort merge is
/// returned anyway.
pub fn merge_parts(first: &str, second: &str) -> String {
    let stripped = first.replacen(CONTINUATION_MARKER, "", 1);
    let stripped = stripped.trim();
    let mut second_text = second.trim_start();

    let reference = final_segment(first);
    let overlap = overlap_len(reference, second_text);
    if overlap > 0 {
        second_text = strip_chars(second_text, overlap).trim_start();
    }

    let residual = overlap_len(stripped, second_text);
    if residual > 0 {
        second_text = strip_chars(second_text, residual).trim_start();
    }

    let separator = if stripped.ends_with(['.', '!', '?']) {
        "\n"
    } else if !stripped.ends_with(char::is_whitespace) && !stripped.is_empty() {
        " "
    } else {
        ""
    };
    let merged = format!("{}{}{}", stripped, separator, second_text)
        .trim()
        .to_string();

    if merged.contains(CONTINUATION_MARKER) || overlap_len(stripped, second_text) > 0 {
        warn!("inconsistencies remain after fusing the two responses");
    }

    merged
}
