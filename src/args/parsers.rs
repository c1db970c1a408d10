use std::time::Duration;

use crate::error::InputError;

/// Parses `30`, `500ms`, `10s`, `2m` or `1h`. A bare number is seconds.
pub(crate) fn parse_duration_arg(s: &str) -> Result<Duration, InputError> {
    let value = s.trim();
    if value.is_empty() {
        return Err(InputError::DurationEmpty);
    }

    let digits_len = value
        .chars()
        .take_while(char::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return Err(InputError::InvalidDurationFormat {
            value: value.to_owned(),
        });
    }
    let (num_part, unit_part) = value.split_at(digits_len);
    let number: u64 = num_part
        .parse()
        .map_err(|err| InputError::InvalidDurationNumber {
            value: value.to_owned(),
            source: err,
        })?;

    let unit = if unit_part.is_empty() { "s" } else { unit_part };
    let duration = match unit {
        "ms" => Duration::from_millis(number),
        "s" => Duration::from_secs(number),
        "m" => Duration::from_secs(number.checked_mul(60).ok_or(InputError::DurationOverflow)?),
        "h" => Duration::from_secs(
            number
                .checked_mul(60)
                .and_then(|minutes| minutes.checked_mul(60))
                .ok_or(InputError::DurationOverflow)?,
        ),
        _ => {
            return Err(InputError::InvalidDurationUnit {
                unit: unit.to_owned(),
            });
        }
    };

    if duration.is_zero() {
        return Err(InputError::DurationZero);
    }
    Ok(duration)
}

pub(crate) fn parse_positive_usize(s: &str) -> Result<usize, InputError> {
    let value: usize = s
        .trim()
        .parse()
        .map_err(|err| InputError::InvalidNumber { source: err })?;
    if value == 0 {
        return Err(InputError::ValueTooSmall { min: 1 });
    }
    Ok(value)
}

/// Requests per second; `0` disables rate limiting.
pub(crate) fn parse_rate(s: &str) -> Result<f64, InputError> {
    let invalid = || InputError::InvalidRate {
        value: s.to_owned(),
    };
    let rate: f64 = s.trim().parse().map_err(|_err| invalid())?;
    if !rate.is_finite() || rate < 0.0 {
        return Err(invalid());
    }
    Ok(rate)
}

pub(crate) fn parse_bool_env(s: &str) -> Result<bool, InputError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        _ => Err(InputError::InvalidBoolean {
            value: s.to_owned(),
        }),
    }
}
