//! Channel name formatting for the price-in-name side effect.

use crate::alert::payload::DisplayCurrency;

/// Removes one trailing `" (...)"` group, e.g. `"btc-talk (¥1.20)"` -> `"btc-talk"`.
///
/// The group must be non-empty and contain no `)`; names without such a
/// suffix are returned unchanged.
pub fn strip_suffix(name: &str) -> &str {
    let Some(body) = name.strip_suffix(')') else {
        return name;
    };

    // the group may not contain ')', so it starts after the last one
    let tail_start = body.rfind(')').map_or(0, |i| i + 1);
    let Some(open) = body[tail_start..].find('(').map(|i| i + tail_start) else {
        return name;
    };

    if open + 1 == body.len() {
        return name;
    }

    body[..open].trim_end()
}

/// Suffix shown in the channel name.
///
/// With history: signed change in display currency since `past`, e.g.
/// `"(+¥12.34)"`. Without: the current price, e.g. `"(¥1523.00)"`.
pub fn price_suffix(current: f64, past: Option<f64>, rate: f64, currency: &DisplayCurrency) -> String {
    let cur = &currency.sign;
    match past {
        Some(past) => {
            let delta = (current - past) * rate;
            let sign = if delta >= 0.0 { '+' } else { '-' };
            format!("({sign}{cur}{:.2})", delta.abs())
        }
        None => format!("({cur}{:.2})", current * rate),
    }
}

pub fn next_channel_name(current_name: &str, suffix: &str) -> String {
    let base = strip_suffix(current_name);
    if base.is_empty() {
        suffix.to_string()
    } else {
        format!("{base} {suffix}")
    }
}
