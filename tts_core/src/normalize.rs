//! Text normalization: expand numerals, abbreviations and symbols into
//! speakable words before phonemization.
//!
//! Normalization is idempotent: running it over already-normalized text
//! yields the same text. Unknown symbols pass through unchanged; the
//! phonemizer decides what to do with them.

use crate::{TtsError, TtsResult};

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("Dr.", "Doctor"),
    ("Mr.", "Mister"),
    ("Mrs.", "Missus"),
    ("Ms.", "Miss"),
    ("Prof.", "Professor"),
    ("etc.", "et cetera"),
    ("e.g.", "for example"),
    ("i.e.", "that is"),
    ("vs.", "versus"),
];

/// Normalize raw request text into words and punctuation only.
///
/// Fails only on structurally invalid input (embedded NUL); valid but
/// unusual text always succeeds.
pub fn normalize_text(text: &str) -> TtsResult<String> {
    if text.contains('\0') {
        return Err(TtsError::Normalization(
            "text contains an embedded NUL character".to_string(),
        ));
    }

    let expanded = expand_abbreviations(text);
    let chars: Vec<char> = expanded.chars().collect();
    let mut out = String::with_capacity(expanded.len());

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if c == '-'
            && i + 1 < chars.len()
            && chars[i + 1].is_ascii_digit()
            && out.chars().last().map_or(true, char::is_whitespace)
        {
            push_word(&mut out, "minus");
            i += 1;
            continue;
        }

        if c.is_ascii_digit() {
            i = expand_number(&chars, i, &mut out);
            continue;
        }

        match c {
            '&' => push_word(&mut out, "and"),
            '@' => push_word(&mut out, "at"),
            '%' => push_word(&mut out, "percent"),
            _ if c.is_control() => out.push(' '),
            _ => out.push(c),
        }
        i += 1;
    }

    Ok(collapse_whitespace(&out))
}

fn expand_abbreviations(text: &str) -> String {
    text.split(' ')
        .map(|token| {
            ABBREVIATIONS
                .iter()
                .find(|(abbrev, _)| *abbrev == token)
                .map(|(_, expansion)| *expansion)
                .unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Consume one numeric expression starting at `chars[start]`, append its
/// spelled-out form, and return the index past it.
fn expand_number(chars: &[char], start: usize, out: &mut String) -> usize {
    let mut i = start;
    let mut int_digits = String::new();
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_digit() {
            int_digits.push(c);
            i += 1;
        } else if c == ',' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit() {
            // thousands separator
            i += 1;
        } else {
            break;
        }
    }

    let mut words = spell_integer(&int_digits);

    if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
        i += 1;
        let mut frac = String::new();
        while i < chars.len() && chars[i].is_ascii_digit() {
            frac.push(chars[i]);
            i += 1;
        }
        words.push_str(" point ");
        words.push_str(&spell_digits(&frac));
    }

    if out.chars().last().is_some_and(char::is_alphanumeric) {
        out.push(' ');
    }
    out.push_str(&words);
    if i < chars.len() && chars[i].is_alphanumeric() {
        out.push(' ');
    }
    i
}

fn push_word(out: &mut String, word: &str) {
    if out.chars().last().is_some_and(|p| !p.is_whitespace()) {
        out.push(' ');
    }
    out.push_str(word);
    out.push(' ');
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn spell_integer(digits: &str) -> String {
    match digits.parse::<u64>() {
        Ok(n) => number_to_words(n),
        // Too large for u64: read the digits out one by one.
        Err(_) => spell_digits(digits),
    }
}

fn spell_digits(digits: &str) -> String {
    digits
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| ONES[d as usize])
        .collect::<Vec<_>>()
        .join(" ")
}

const ONES: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SCALES: [(u64, &str); 6] = [
    (1_000_000_000_000_000_000, "quintillion"),
    (1_000_000_000_000_000, "quadrillion"),
    (1_000_000_000_000, "trillion"),
    (1_000_000_000, "billion"),
    (1_000_000, "million"),
    (1_000, "thousand"),
];

fn number_to_words(n: u64) -> String {
    if n < 20 {
        return ONES[n as usize].to_string();
    }
    if n < 100 {
        let tens = TENS[(n / 10) as usize];
        return match n % 10 {
            0 => tens.to_string(),
            rest => format!("{tens} {}", ONES[rest as usize]),
        };
    }
    if n < 1_000 {
        let hundreds = format!("{} hundred", ONES[(n / 100) as usize]);
        return match n % 100 {
            0 => hundreds,
            rest => format!("{hundreds} {}", number_to_words(rest)),
        };
    }
    for (scale, name) in SCALES {
        if n >= scale {
            let head = format!("{} {name}", number_to_words(n / scale));
            return match n % scale {
                0 => head,
                rest => format!("{head} {}", number_to_words(rest)),
            };
        }
    }
    unreachable!("all u64 values are covered by the scale table")
}
