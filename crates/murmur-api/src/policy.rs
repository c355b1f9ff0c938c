//! Decision logic for submitted verification codes. Pure over account
//! state and the current time, so every branch is unit-testable.

use rand::Rng;

/// How long a signup reservation (and its code) stays valid.
pub const CODE_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    Accepted,
    WrongCode,
    Expired,
}

/// A wrong code is reported as wrong even when the window has also lapsed;
/// only a matching code can be "expired".
pub fn evaluate(stored_code: &str, expiry_unix: i64, submitted: &str, now_unix: i64) -> CodeCheck {
    if submitted != stored_code {
        return CodeCheck::WrongCode;
    }
    if now_unix >= expiry_unix {
        return CodeCheck::Expired;
    }
    CodeCheck::Accepted
}

/// Fixed-length numeric code, regenerated on every signup attempt.
pub fn generate_code() -> String {
    rand::rng().random_range(100_000..=999_999u32).to_string()
}
