//! Canonical form for comparing bilingual answers.
//!
//! Answers are didactic strings, not values: operands keep their order,
//! `<=` and `≤` stay distinct, and nothing is evaluated.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::Problem;

/// Arabic variable glyph used in place of `x`.
const ARABIC_X: char = 'س';

lazy_static! {
    static ref OPERATOR_SPACING: Regex = Regex::new(r"\s*([<>=≤≥])\s*").unwrap();
}

pub fn normalize(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| match c {
            '\u{0660}'..='\u{0669}' => {
                char::from(b'0' + (c as u32 - 0x0660) as u8)
            }
            ARABIC_X => 'x',
            other => other.to_ascii_lowercase(),
        })
        .collect();

    OPERATOR_SPACING
        .replace_all(mapped.trim(), "$1")
        .into_owned()
}

pub fn answers_match(submitted: &str, expected: &str) -> bool {
    normalize(submitted) == normalize(expected)
}

/// True when the submission matches the English or the Arabic final answer.
/// Problems without a final answer never match.
pub fn matches_final_answer(problem: &Problem, submitted: &str) -> bool {
    let Some(answer) = problem.answer.as_ref() else {
        return false;
    };
    let submitted = normalize(submitted);
    submitted == normalize(&answer.en) || submitted == normalize(&answer.ar)
}
