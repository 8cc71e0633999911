/// Result of comparing a current price with a past reference price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Signed change in percent, positive when the price rose.
    pub percent_change: f64,
    pub triggered: bool,
}

/// Decides whether the move from `past_price` to `current_price` reaches
/// `threshold_percent` in absolute terms.
///
/// # Panics
/// If `past_price` is not strictly positive. Quotes are validated upstream
/// and missing history short-circuits before this call, so a non-positive
/// reference price means a caller or store bug.
pub fn evaluate(current_price: f64, past_price: f64, threshold_percent: f64) -> Evaluation {
    assert!(
        past_price > 0.0,
        "past price must be strictly positive, got {past_price}"
    );

    let percent_change = (current_price - past_price) / past_price * 100.0;

    Evaluation {
        percent_change,
        triggered: percent_change.abs() >= threshold_percent,
    }
}
