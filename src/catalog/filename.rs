//! Recording filename parser
//!
//! Replay recorders name files after the moment recording started, e.g.
//! `War Thunder 2025.04.14 - 14.00.35.105.DVR.mp4`. The trailing fraction is
//! optional and has been seen with two and three digits.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

fn filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^War Thunder (\d{4})\.(\d{2})\.(\d{2}) - (\d{2})\.(\d{2})\.(\d{2})(?:\.(\d+))?(?:\.DVR)?\.",
        )
        .expect("static filename pattern")
    })
}

/// Parse the recording start encoded in a filename.
///
/// Returns `None` when the name does not follow the recorder's pattern or
/// names an impossible date. A fraction that cannot be represented falls
/// back to the whole-second timestamp.
pub fn parse_recording_start(filename: &str) -> Option<NaiveDateTime> {
    let caps = filename_pattern().captures(filename)?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let date = NaiveDate::from_ymd_opt(num(1)? as i32, num(2)?, num(3)?)?;
    let whole = NaiveTime::from_hms_opt(num(4)?, num(5)?, num(6)?)?;

    let micros = caps.get(7).and_then(|m| fraction_to_micros(m.as_str()));
    let time = match micros {
        Some(us) => NaiveTime::from_hms_micro_opt(num(4)?, num(5)?, num(6)?, us).unwrap_or(whole),
        None => whole,
    };

    Some(NaiveDateTime::new(date, time))
}

/// Interpret a decimal fraction, keeping at most microsecond precision
fn fraction_to_micros(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let truncated = &digits[..digits.len().min(6)];
    let value: u32 = truncated.parse().ok()?;
    Some(value * 10u32.pow(6 - truncated.len() as u32))
}
