//! String similarity and label helpers.
//!
//! History sources do not normalize artist or track names, so grouping and
//! candidate matching both rely on fuzzy comparison instead of equality.

use std::collections::HashMap;

/// Similarity between two strings in `0.0..=1.0` using the Sørensen–Dice
/// coefficient over character bigrams. Case-insensitive; whitespace inside
/// the strings counts like any other character.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a == b {
        return 1.0;
    }
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.len() < 2 || b_chars.len() < 2 {
        return 0.0;
    }

    let mut bigrams: HashMap<(char, char), usize> = HashMap::new();
    for w in a_chars.windows(2) {
        *bigrams.entry((w[0], w[1])).or_insert(0) += 1;
    }

    let mut intersection = 0usize;
    for w in b_chars.windows(2) {
        if let Some(count) = bigrams.get_mut(&(w[0], w[1])) {
            if *count > 0 {
                *count -= 1;
                intersection += 1;
            }
        }
    }

    (2.0 * intersection as f64) / ((a_chars.len() - 1) + (b_chars.len() - 1)) as f64
}

/// Truncate `text` to at most `max_len` characters, replacing the tail with
/// `...` when something was cut. The output never exceeds `max_len`; when
/// the limit cannot fit the indicator the text is cut plain.
pub fn trim_text(text: &str, max_len: usize) -> String {
    const INDICATOR: &str = "...";
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_len {
        return text.to_string();
    }
    if max_len < INDICATOR.len() {
        return chars[..max_len].iter().collect();
    }
    let mut out: String = chars[..max_len - INDICATOR.len()].iter().collect();
    out.push_str(INDICATOR);
    out
}

/// Format a millisecond total as `HH:MM:SS`.
pub fn format_hms(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
