//! User-facing texts and number formatting.

use crate::services::WeatherReport;

pub const GREETING: &str = "Hi! What can I do for you?";

pub const MENU_RETURN: &str = "Back to the menu.\nHelp: /help";

// Weather

pub const WEATHER_PROMPT: &str = "Which city are you interested in?";

pub const WEATHER_UPSTREAM: &str = "Sorry, the weather service is unavailable right now.";

// Currency

pub const CURRENCY_PROMPT: &str =
    "Enter the amount and currencies in the format:\n<amount> <Currency1> <Currency2>";

pub const CURRENCY_FORMAT_REMINDER: &str = "Invalid message format. Send a message like \
'<amount> <Currency1> <Currency2>'.\nTo leave, send: Menu";

pub const CURRENCY_NOT_NUMERIC: &str = "The amount must be numeric.";

pub const CURRENCY_UPSTREAM: &str = "Sorry, the exchange rate service is unavailable right now.";

// Image

pub const IMAGE_UPSTREAM: &str = "Sorry, could not fetch a picture :(";

// Poll

pub const POLL_CHAT_PROMPT: &str = "Enter the id of the chat the poll should be sent to:";

pub const POLL_TITLE_PROMPT: &str = "Enter the poll question:";

pub const POLL_OPTIONS_PROMPT: &str =
    "Enter the answer options separated by ';'\n(at least 2 options):";

pub const POLL_BLANK_INPUT: &str = "This cannot be empty, please try again.";

pub const POLL_CREATED: &str = "Poll created!";

pub const POLL_CHAT_NOT_FOUND: &str = "No chat with this id was found\nCould not send the poll 😢";

pub const POLL_TOO_FEW_OPTIONS: &str =
    "There must be at least 2 answer options\nCould not create the poll 😢";

pub const POLL_TOO_MANY_OPTIONS: &str =
    "A poll can have at most 10 answer options\nCould not create the poll 😢";

pub const POLL_EMPTY_OPTION: &str = "An answer option cannot be empty\nCould not create the poll 😢";

pub const POLL_UPSTREAM: &str = "Sorry, the poll could not be created right now 😢";

pub fn weather_report(city: &str, report: &WeatherReport) -> String {
    format!(
        "Now in {}: {}, temperature {}°C, feels like {}°C.\nHumidity {}%, wind speed {} m/s.",
        city,
        report.description,
        format_number(report.temperature),
        format_number(report.feels_like),
        format_number(report.humidity),
        format_number(report.wind_speed),
    )
}

pub fn weather_not_found(city: &str) -> String {
    format!("Could not get the weather for {}.", city)
}

pub fn conversion(amount: f64, from: &str, converted: f64, to: &str) -> String {
    format!(
        "{} {} = {} {}",
        format_amount(amount),
        from.to_uppercase(),
        format_amount(converted),
        to.to_uppercase()
    )
}

pub fn currency_not_found(to: &str) -> String {
    format!("Currency {} not found.", to.to_uppercase())
}

/// Round to two decimals, exact halves to even (`0.125` gives `0.12`).
///
/// Formatting rounds the exact binary value, so `2.675` (stored just below
/// the half) gives `2.67`.
pub fn round_cents(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// Money amounts always show a fractional part: `100.0`, `92.46`.
pub fn format_amount(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Measurements drop a zero fractional part: `21`, `3.5`.
pub fn format_number(value: f64) -> String {
    format!("{}", value)
}
