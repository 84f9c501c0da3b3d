//! Reference transcript normalization.

/// Flatten a Markdown-ish reference transcript into one searchable string.
///
/// Heading lines (`#`) and blank lines are dropped, a leading `[...]`
/// speaker or timestamp prefix is cut, and what remains is joined with
/// single spaces.
pub fn normalize_script(markdown: &str) -> String {
    let kept: Vec<&str> = markdown
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let line = match line.strip_prefix('[').and_then(|_| line.split_once(']')) {
                Some((_, rest)) => rest.trim(),
                None => line,
            };
            (!line.is_empty()).then_some(line)
        })
        .collect();

    collapse_whitespace(&kept.join(" "))
}

/// Collapse every whitespace run into one space and trim the ends.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
