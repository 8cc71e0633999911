//! Alert message composition.
//!
//! Everything here is display-only; nothing in this module feeds back into
//! trigger decisions.

use market::Symbol;
use num_format::{Locale, ToFormattedString};
use serde::Serialize;

pub const COLOR_UP: u32 = 0x00ff00;
pub const COLOR_DOWN: u32 = 0xff0000;

/// Currency prices are quoted in upstream.
pub const BASE_CURRENCY: &str = "USD";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlertField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Platform-neutral alert message. Renderers map it onto whatever rich
/// message format the chat platform offers.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlertPayload {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<AlertField>,
    pub footer: String,

    /// PNG attachment, when a chart could be rendered.
    #[serde(skip)]
    pub chart_png: Option<Vec<u8>>,
}

/// Secondary currency used next to USD prices.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayCurrency {
    pub code: String,
    pub sign: String,
}

impl DisplayCurrency {
    pub fn new(code: &str) -> Self {
        let code = code.to_ascii_uppercase();
        let sign = match code.as_str() {
            "JPY" => "¥".to_string(),
            "EUR" => "€".to_string(),
            "GBP" => "£".to_string(),
            "USD" => "$".to_string(),
            other => format!("{other} "),
        };
        Self { code, sign }
    }
}

impl Default for DisplayCurrency {
    fn default() -> Self {
        Self::new("JPY")
    }
}

/// Current and reference price of one evaluated move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceMove {
    pub current: f64,
    pub past: f64,
    pub percent_change: f64,
}

/// Subscription details that show up in the message.
#[derive(Debug, Clone)]
pub struct AlertContext<'a> {
    pub symbol: &'a Symbol,
    pub window_minutes: u32,
    pub threshold_percent: f64,
    pub holdings: Option<f64>,
    pub direct: bool,
}

pub fn compose(
    ctx: &AlertContext<'_>,
    mv: &PriceMove,
    fx_rate: f64,
    currency: &DisplayCurrency,
) -> AlertPayload {
    let rising = mv.percent_change > 0.0;
    let direction = if rising { "🚀 up" } else { "📉 down" };

    let current_disp = mv.current * fx_rate;
    let past_disp = mv.past * fx_rate;

    let mut fields = vec![
        AlertField {
            name: "Current price".into(),
            value: format!("${:.6} (~{}{:.4})", mv.current, currency.sign, current_disp),
            inline: true,
        },
        AlertField {
            name: format!("{} min ago", ctx.window_minutes),
            value: format!("${:.6} (~{}{:.4})", mv.past, currency.sign, past_disp),
            inline: true,
        },
    ];

    if let Some(holdings) = ctx.holdings.filter(|h| *h > 0.0) {
        let total_disp = holdings * current_disp;
        let total_usd = holdings * mv.current;
        let delta = total_disp - holdings * past_disp;

        fields.push(AlertField {
            name: "💰 Holdings".into(),
            value: format!(
                "{}{} (${})\n(vs before: {}{}{})",
                currency.sign,
                group_thousands(total_disp, 0),
                group_thousands(total_usd, 2),
                if delta >= 0.0 { "+" } else { "-" },
                currency.sign,
                group_thousands(delta.abs(), 0),
            ),
            inline: false,
        });
    }

    if let Some(url) = exchange_link(ctx.symbol) {
        fields.push(AlertField {
            name: "Chart".into(),
            value: url,
            inline: false,
        });
    }

    AlertPayload {
        title: format!("{} {} {:.2}%", ctx.symbol, direction, mv.percent_change.abs()),
        description: format!(
            "Moved past the {}% threshold compared with {} minutes ago.",
            ctx.threshold_percent, ctx.window_minutes
        ),
        color: if rising { COLOR_UP } else { COLOR_DOWN },
        fields,
        footer: if ctx.direct {
            "Price Monitor (direct message)".into()
        } else {
            "Price Monitor".into()
        },
        chart_png: None,
    }
}

/// Exchange page for `<BASE>USDT` spot symbols.
pub fn exchange_link(symbol: &Symbol) -> Option<String> {
    let base = symbol.as_str().strip_suffix("USDT")?;
    if base.is_empty() {
        return None;
    }
    Some(format!("https://www.mexc.com/exchange/{base}_USDT"))
}

/// Formats `value` with `decimals` fraction digits and comma thousands separators.
pub fn group_thousands(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let grouped = int_part
        .parse::<u64>()
        .map(|n| n.to_formatted_string(&Locale::en))
        .unwrap_or_else(|_| int_part.to_string());

    let is_zero = fixed.chars().all(|c| c == '0' || c == '.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };

    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}
