//! Southpaw mirroring: whole-word Left/Right swap.
//!
//! Swaps only standalone "left"/"right" tokens (case-insensitive) and
//! preserves the case pattern of the original token, so applying the swap
//! twice returns the input. Entries authored for the southpaw stance are
//! exempted by the caller to avoid double-negation.

/// Swap whole-word Left/Right tokens in `text`.
pub fn mirror_stance(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();

    for ch in text.chars() {
        if ch.is_alphabetic() {
            word.push(ch);
        } else {
            flush_word(&mut out, &word);
            word.clear();
            out.push(ch);
        }
    }
    flush_word(&mut out, &word);
    out
}

fn flush_word(out: &mut String, word: &str) {
    if word.is_empty() {
        return;
    }
    let lower = word.to_lowercase();
    let replacement = match lower.as_str() {
        "left" => Some("right"),
        "right" => Some("left"),
        _ => None,
    };
    match replacement {
        Some(opposite) => out.push_str(&match_case(word, opposite)),
        None => out.push_str(word),
    }
}

/// Re-case `replacement` to mimic the case pattern of `original`:
/// all-caps, leading capital, or lowercase.
fn match_case(original: &str, replacement: &str) -> String {
    let mut chars = original.chars();
    let first_upper = chars.next().map(char::is_uppercase).unwrap_or(false);
    let rest_upper = chars.clone().any(char::is_uppercase);

    if first_upper && rest_upper {
        replacement.to_uppercase()
    } else if first_upper {
        let mut s = String::with_capacity(replacement.len());
        let mut rc = replacement.chars();
        if let Some(c) = rc.next() {
            s.extend(c.to_uppercase());
        }
        s.extend(rc);
        s
    } else {
        replacement.to_string()
    }
}
