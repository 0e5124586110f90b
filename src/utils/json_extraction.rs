//! JSON extraction utilities for parsing LLM responses.
//!
//! Generative services are asked for "ONLY a JSON array" but routinely wrap
//! it in prose or markdown fences anyway. The helpers here locate the array
//! without interpreting it.
//!
//! # Extraction order
//!
//! 1. A fenced ```` ```json ```` block
//! 2. Any other fenced block
//! 3. The raw text, when it starts with `[`
//! 4. The first `[` anywhere in the text
//!
//! In every case the result is the first top-level `[...]` span of the chosen
//! region, found by bracket matching that skips brackets inside strings.
//!
//! # Example
//!
//! ```
//! use puzzle_forge::utils::json_extraction::extract_json_array;
//!
//! let response = "Sure! Here you go:\n```json\n[\"Mirror the grid\"]\n```";
//! assert_eq!(extract_json_array(response), Some("[\"Mirror the grid\"]"));
//! ```

/// Returns the body of the first ```` ```json ```` fenced block, trimmed.
pub fn extract_from_json_code_block(content: &str) -> Option<&str> {
    let start = content.find("```json")? + "```json".len();
    let end = content[start..].find("```")?;
    Some(content[start..start + end].trim())
}

/// Returns the body of the first fenced block of any language, trimmed.
///
/// The info string (e.g. `javascript`) on the opening fence line is skipped.
pub fn extract_from_generic_code_block(content: &str) -> Option<&str> {
    let fence = content.find("```")? + 3;
    let body_start = content[fence..]
        .find('\n')
        .map(|i| fence + i + 1)
        .unwrap_or(fence);
    let end = content[body_start..].find("```")?;
    Some(content[body_start..body_start + end].trim())
}

/// Finds the index of the `]` closing the `[` at position 0.
///
/// Brackets inside JSON string literals (including escaped quotes) are ignored.
/// Returns `None` if `s` does not start with `[` or the array never closes.
pub fn find_matching_bracket(s: &str) -> Option<usize> {
    if !s.starts_with('[') {
        return None;
    }

    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '[' if !in_string => depth += 1,
            ']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Returns the first complete top-level array in `region`.
fn first_array_span(region: &str) -> Option<&str> {
    let start = region.find('[')?;
    let candidate = &region[start..];
    find_matching_bracket(candidate).map(|end| &candidate[..=end])
}

/// Extracts the first JSON array from a free-form LLM response.
///
/// Returns `None` when no complete `[...]` span exists anywhere in the
/// preferred region. The span is not validated as JSON; callers parse it.
pub fn extract_json_array(content: &str) -> Option<&str> {
    let trimmed = content.trim();

    if let Some(block) = extract_from_json_code_block(trimmed) {
        return first_array_span(block);
    }

    if let Some(block) = extract_from_generic_code_block(trimmed) {
        if let Some(span) = first_array_span(block) {
            return Some(span);
        }
    }

    if trimmed.starts_with('[') {
        if let Some(end) = find_matching_bracket(trimmed) {
            return Some(&trimmed[..=end]);
        }
    }

    first_array_span(trimmed)
}
