/// Score for a fresh correct answer.
pub const FULL_SCORE: u32 = 100;
/// A correct answer is never worth less than this.
pub const SCORE_FLOOR: u32 = 40;
pub const RETRY_PENALTY: u32 = 20;
pub const HINT_PENALTY: u32 = 10;

/// `100 - 20 per retry - 10 per hint`, floored at 40; 0 when incorrect.
pub fn score(attempts: u32, hints_used: u32, correct: bool) -> u32 {
    if !correct {
        return 0;
    }

    let retry_penalty = attempts.saturating_sub(1).saturating_mul(RETRY_PENALTY);
    let hint_penalty = hints_used.saturating_mul(HINT_PENALTY);

    FULL_SCORE
        .saturating_sub(retry_penalty)
        .saturating_sub(hint_penalty)
        .max(SCORE_FLOOR)
}
