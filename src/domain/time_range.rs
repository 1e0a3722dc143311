// Relative time expressions ("now-6h", "now/d") resolved to absolute instants
use chrono::{
    DateTime, Datelike, Duration, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone,
    Timelike, Utc,
};
use chrono_tz::Tz;

use super::dashboard::TimeRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    fn from_char(c: char) -> Option<Self> {
        match c {
            's' => Some(TimeUnit::Second),
            'm' => Some(TimeUnit::Minute),
            'h' => Some(TimeUnit::Hour),
            'd' => Some(TimeUnit::Day),
            'w' => Some(TimeUnit::Week),
            'M' => Some(TimeUnit::Month),
            'y' => Some(TimeUnit::Year),
            _ => None,
        }
    }
}

/// Resolve both ends of a range against `now`, rounding in `zone`. Ends that
/// cannot be parsed are passed through untouched.
pub fn resolve_absolute(range: &TimeRange, now: DateTime<Utc>, zone: Tz) -> TimeRange {
    let resolve = |text: &str, round_up: bool| {
        parse_bound(text, now, round_up, zone)
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_else(|| text.to_string())
    };

    TimeRange {
        from: resolve(&range.from, false),
        to: resolve(&range.to, true),
    }
}

/// Parse one end of a range. `round_up` selects end-of-unit rounding for
/// `/unit`; days, weeks, months and years follow the calendar of `zone`.
pub fn parse_bound(text: &str, now: DateTime<Utc>, round_up: bool, zone: Tz) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Some(math) = text.strip_prefix("now") {
        return apply_math(now.with_timezone(&zone), math, round_up).map(|t| t.with_timezone(&Utc));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    text.parse::<i64>()
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

fn apply_math(mut time: DateTime<Tz>, math: &str, round_up: bool) -> Option<DateTime<Tz>> {
    let chars: Vec<char> = math.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let op = chars[i];
        i += 1;

        match op {
            '/' => {
                let unit = TimeUnit::from_char(*chars.get(i)?)?;
                i += 1;
                time = if round_up {
                    end_of(time, unit)?
                } else {
                    start_of(time, unit)?
                };
            }
            '+' | '-' => {
                let digits_start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let amount: i64 = if digits_start == i {
                    1
                } else {
                    chars[digits_start..i].iter().collect::<String>().parse().ok()?
                };
                let unit = TimeUnit::from_char(*chars.get(i)?)?;
                i += 1;

                let signed = if op == '-' { -amount } else { amount };
                time = shift(time, unit, signed)?;
            }
            _ => return None,
        }
    }

    Some(time)
}

/// Map a wall-clock time back into the zone. A time skipped by a DST jump
/// moves forward to the first valid instant after it.
fn localize(zone: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => (1..=4)
            .filter_map(|hours| naive.checked_add_signed(Duration::try_hours(hours)?))
            .find_map(|later| zone.from_local_datetime(&later).earliest()),
    }
}

fn shift(time: DateTime<Tz>, unit: TimeUnit, amount: i64) -> Option<DateTime<Tz>> {
    let zone = time.timezone();
    let local = time.naive_local();

    match unit {
        TimeUnit::Second => time.checked_add_signed(Duration::try_seconds(amount)?),
        TimeUnit::Minute => time.checked_add_signed(Duration::try_minutes(amount)?),
        TimeUnit::Hour => time.checked_add_signed(Duration::try_hours(amount)?),
        TimeUnit::Day => localize(zone, local.checked_add_signed(Duration::try_days(amount)?)?),
        TimeUnit::Week => localize(zone, local.checked_add_signed(Duration::try_weeks(amount)?)?),
        TimeUnit::Month => localize(zone, shift_months(local, amount)?),
        TimeUnit::Year => localize(zone, shift_months(local, amount.checked_mul(12)?)?),
    }
}

fn shift_months(time: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let count = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months < 0 {
        time.checked_sub_months(count)
    } else {
        time.checked_add_months(count)
    }
}

fn start_of(time: DateTime<Tz>, unit: TimeUnit) -> Option<DateTime<Tz>> {
    let local = time.naive_local();
    let date = local.date();
    let midnight = |d: NaiveDate| d.and_time(NaiveTime::MIN);

    let start = match unit {
        TimeUnit::Second => date.and_hms_opt(local.hour(), local.minute(), local.second())?,
        TimeUnit::Minute => date.and_hms_opt(local.hour(), local.minute(), 0)?,
        TimeUnit::Hour => date.and_hms_opt(local.hour(), 0, 0)?,
        TimeUnit::Day => midnight(date),
        // Weeks start on Sunday
        TimeUnit::Week => {
            let back = i64::from(date.weekday().num_days_from_sunday());
            midnight(date.checked_sub_signed(Duration::try_days(back)?)?)
        }
        TimeUnit::Month => midnight(date.with_day(1)?),
        TimeUnit::Year => midnight(date.with_day(1)?.with_month(1)?),
    };

    localize(time.timezone(), start)
}

fn end_of(time: DateTime<Tz>, unit: TimeUnit) -> Option<DateTime<Tz>> {
    let next = shift(start_of(time, unit)?, unit, 1)?;
    next.checked_sub_signed(Duration::try_milliseconds(1)?)
}
