//! Normalisation of the registration time column to `HH:MM:SS`.

use chrono::NaiveTime;

use crate::models::table::duration_to_clock;
use crate::models::{Table, Value};

/// Column holding the registration time.
pub const REGISTRATION_TIME_COLUMN: &str = "jam_reg";

/// Rewrite every `jam_reg` value as `HH:MM:SS`. No-op without the column.
pub fn format_time_field(table: &mut Table) {
    table.map_column(REGISTRATION_TIME_COLUMN, format_time);
}

/// Normalise a single registration time.
///
/// Short text (`H:MM`, `HH:MM`) gains `:00` seconds, eight-character text is
/// taken as already normalised, and durations are rendered as a clock.
/// Anything else, including text that fails to parse, is returned as is.
pub fn format_time(value: Value) -> Value {
    match value {
        Value::Text(text) if text.len() <= 5 && is_clock_text(&text) => {
            match NaiveTime::parse_from_str(&text, "%H:%M") {
                Ok(time) => Value::Text(time.format("%H:%M:%S").to_string()),
                Err(_) => Value::Text(text),
            }
        }
        Value::Duration(d) => Value::Text(duration_to_clock(d)),
        other => other,
    }
}

// chrono skips whitespace before numeric fields; a padded value is not a clock.
fn is_clock_text(text: &str) -> bool {
    text.bytes().all(|b| b.is_ascii_digit() || b == b':')
}
