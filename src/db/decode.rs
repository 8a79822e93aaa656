use chrono::{Duration, NaiveDate, NaiveDateTime};
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::db::SqlParam;
use crate::error::QueryError;
use crate::models::{Table, Value};

/// Wire format the rows arrived in.
///
/// Unbound statements go over the text protocol; prepared statements return
/// binary rows. The driver does not expose this per value, so the caller
/// passes it along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Protocol {
    Text,
    Binary,
}

impl Protocol {
    pub(super) fn for_params(params: &[SqlParam]) -> Self {
        if params.is_empty() {
            Protocol::Text
        } else {
            Protocol::Binary
        }
    }
}

/// Convert a fetched result set into a [`Table`], keeping column order.
pub(super) fn rows_to_table(rows: &[MySqlRow], protocol: Protocol) -> Result<Table, QueryError> {
    let Some(first) = rows.first() else {
        return Ok(Table::default());
    };

    let columns = first.columns().iter().map(|c| c.name().to_string()).collect();
    let mut table = Table::new(columns);
    for row in rows {
        let values = (0..row.len())
            .map(|index| decode_value(row, index, protocol))
            .collect::<Result<Vec<_>, _>>()?;
        table.push_row(values);
    }
    Ok(table)
}

fn decode_value(row: &MySqlRow, index: usize, protocol: Protocol) -> Result<Value, QueryError> {
    let column = &row.columns()[index];
    let wrap = |source| QueryError::Decode {
        column: column.name().to_string(),
        source,
    };

    if row.try_get_raw(index).map_err(wrap)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match column.type_info().name() {
        "BOOLEAN" => row.try_get_unchecked::<bool, _>(index).map(Value::Bool),
        name if name.ends_with("UNSIGNED") => {
            row.try_get_unchecked::<u64, _>(index).map(Value::UInt)
        }
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            row.try_get_unchecked::<i64, _>(index).map(Value::Int)
        }
        "FLOAT" => row
            .try_get_unchecked::<f32, _>(index)
            .map(|f| Value::Float(f64::from(f))),
        "DOUBLE" => row.try_get_unchecked::<f64, _>(index).map(Value::Float),
        "DATE" => row.try_get_unchecked::<NaiveDate, _>(index).map(Value::Date),
        "DATETIME" | "TIMESTAMP" => row
            .try_get_unchecked::<NaiveDateTime, _>(index)
            .map(Value::DateTime),
        // The driver's own TIME decoding drops the day count and the sign.
        "TIME" => row.try_get_unchecked::<&[u8], _>(index).and_then(|raw| {
            let parsed = match protocol {
                Protocol::Binary => time_from_binary(raw),
                Protocol::Text => std::str::from_utf8(raw).ok().and_then(time_from_text),
            };
            parsed
                .map(Value::Duration)
                .ok_or_else(|| sqlx::Error::Decode(format!("invalid TIME value {:?}", raw).into()))
        }),
        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
        | "GEOMETRY" => row.try_get_unchecked::<Vec<u8>, _>(index).map(Value::Bytes),
        // CHAR, VARCHAR, TEXT, ENUM, SET, DECIMAL and JSON all arrive as text.
        _ => row.try_get_unchecked::<String, _>(index).map(Value::Text),
    };

    value.map_err(wrap)
}

const MAX_TIME_HOURS: i64 = 838;

/// Binary-protocol `TIME`: a length byte (0, 8 or 12), the sign, a
/// little-endian day count, hours, minutes, seconds and optional microseconds.
fn time_from_binary(raw: &[u8]) -> Option<Duration> {
    let (&len, body) = raw.split_first()?;
    if len == 0 {
        return Some(Duration::zero());
    }
    if body.len() != usize::from(len) || (len != 8 && len != 12) {
        return None;
    }

    let negative = body[0] != 0;
    let days = u32::from_le_bytes(body[1..5].try_into().ok()?);
    let micros = match body.get(8..12) {
        Some(bytes) => u32::from_le_bytes(bytes.try_into().ok()?),
        None => 0,
    };
    let elapsed = Duration::days(i64::from(days))
        + Duration::hours(i64::from(body[5]))
        + Duration::minutes(i64::from(body[6]))
        + Duration::seconds(i64::from(body[7]))
        + Duration::microseconds(i64::from(micros));
    Some(if negative { -elapsed } else { elapsed })
}

/// Text-protocol `TIME`: `[-]H..H:MM:SS[.ffffff]`, hours up to 838.
fn time_from_text(text: &str) -> Option<Duration> {
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let mut parts = text.splitn(3, ':');
    let hours = digits(parts.next()?)?;
    let minutes = digits(parts.next()?)?;
    let seconds = parts.next()?;
    let (seconds, fraction) = match seconds.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (seconds, None),
    };
    let seconds = digits(seconds)?;
    if hours > MAX_TIME_HOURS || minutes >= 60 || seconds >= 60 {
        return None;
    }

    let micros = match fraction {
        Some(f) if !f.is_empty() && f.len() <= 6 => digits(f)? * 10_i64.pow(6 - f.len() as u32),
        Some(_) => return None,
        None => 0,
    };
    let elapsed = Duration::hours(hours)
        + Duration::minutes(minutes)
        + Duration::seconds(seconds)
        + Duration::microseconds(micros);
    Some(if negative { -elapsed } else { elapsed })
}

fn digits(field: &str) -> Option<i64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}
