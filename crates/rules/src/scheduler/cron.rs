//! Schedule parsing: cron normalization, `@` descriptors, `@every` intervals.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;

/// A parsed rule schedule.
#[derive(Debug, Clone)]
pub enum RuleSchedule {
    Cron(Box<Schedule>),
    /// Fixed interval measured from the previous completion.
    Every(Duration),
}

impl RuleSchedule {
    /// Parse a cron expression, descriptor, or `@every <duration>`.
    pub fn parse(expr: &str) -> Result<Self, String> {
        let trimmed = expr.trim();
        if let Some(rest) = trimmed.strip_prefix("@every") {
            let interval = parse_every(rest)
                .ok_or_else(|| format!("invalid @every duration '{}'", rest.trim()))?;
            return Ok(RuleSchedule::Every(interval));
        }

        let normalized = normalize_cron(trimmed)?;
        Schedule::from_str(&normalized)
            .map(|s| RuleSchedule::Cron(Box::new(s)))
            .map_err(|e| format!("invalid cron expression '{trimmed}': {e}"))
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            RuleSchedule::Cron(schedule) => schedule.after(after).next(),
            RuleSchedule::Every(interval) => {
                Some(*after + chrono::Duration::from_std(*interval).ok()?)
            }
        }
    }
}

/// Normalize an expression to the 6/7-field form the `cron` crate expects.
///
/// 5-field (`min hour dom month dow`) gets a zero seconds field prepended.
/// 5- and 6-field expressions use standard day-of-week numbering
/// (0 or 7 = Sunday) and are rewritten to day names, since the `cron` crate
/// counts Sunday as 1. 7-field (trailing year) passes through untouched.
/// Named descriptors expand to their 6-field equivalent.
pub(crate) fn normalize_cron(expr: &str) -> Result<String, String> {
    let trimmed = expr.trim();
    if trimmed.starts_with('@') {
        let expanded = match trimmed.to_ascii_lowercase().as_str() {
            "@yearly" | "@annually" => "0 0 0 1 1 *",
            "@monthly" => "0 0 0 1 * *",
            "@weekly" => "0 0 0 * * Sun",
            "@daily" | "@midnight" => "0 0 0 * * *",
            "@hourly" => "0 0 * * * *",
            _ => return Err(format!("unknown schedule descriptor '{trimmed}'")),
        };
        return Ok(expanded.to_string());
    }

    let mut fields: Vec<String> = trimmed.split_whitespace().map(str::to_string).collect();
    match fields.len() {
        5 => fields.insert(0, "0".to_string()),
        6 => {}
        7 => return Ok(fields.join(" ")),
        n => {
            return Err(format!(
                "cron must have 5, 6 or 7 fields, got {n} in '{trimmed}'"
            ))
        }
    }
    fields[5] = day_names(&fields[5])
        .map_err(|e| format!("invalid day-of-week in '{trimmed}': {e}"))?;
    Ok(fields.join(" "))
}

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Rewrite a day-of-week field (0-7, names, `*`, ranges, lists, steps) into
/// an explicit list of day names. `*` and `?` without a step are kept.
fn day_names(field: &str) -> Result<String, String> {
    if field == "*" || field == "?" {
        return Ok(field.to_string());
    }

    let mut days = [false; 7];
    for item in field.split(',') {
        let (base, step) = match item.split_once('/') {
            Some((base, step)) => {
                let step: usize = step.parse().map_err(|_| format!("bad step in '{item}'"))?;
                if step == 0 {
                    return Err(format!("zero step in '{item}'"));
                }
                (base, Some(step))
            }
            None => (item, None),
        };

        let (first, last) = match base {
            "*" | "?" => (0, 6),
            _ => match base.split_once('-') {
                Some((a, b)) => (day_number(a)?, day_number(b)?),
                // `N/step` runs from N to the end of the week.
                None if step.is_some() => (day_number(base)?, 6),
                None => {
                    let day = day_number(base)?;
                    (day, day)
                }
            },
        };

        if first > last {
            return Err(format!("range '{base}' runs backwards"));
        }
        // 7 is Sunday again, so `5-7` covers Fri, Sat and Sun.
        for day in (first..=last).step_by(step.unwrap_or(1)) {
            days[day % 7] = true;
        }
    }

    let names: Vec<&str> = days
        .iter()
        .zip(DAY_NAMES)
        .filter_map(|(on, name)| on.then_some(name))
        .collect();
    Ok(names.join(","))
}

fn day_number(token: &str) -> Result<usize, String> {
    if let Ok(n) = token.parse::<usize>() {
        return if n <= 7 {
            Ok(n)
        } else {
            Err(format!("day {n} is out of range 0-7"))
        };
    }
    DAY_NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(token))
        .ok_or_else(|| format!("unknown day '{token}'"))
}

/// Parse the interval of an `@every` schedule.
///
/// One or more `<count><unit>` components, units `d`, `h`, `m`, `s` and `ms`
/// (`90s`, `1h30m`, `1d12h`). Every count needs a unit. Returns `None` for
/// empty, malformed, zero or overflowing intervals.
pub fn parse_every(s: &str) -> Option<Duration> {
    let mut rest = s.trim();
    if rest.is_empty() {
        return None;
    }

    let mut total = Duration::ZERO;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let count: u64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let (unit_ms, len) = if rest.starts_with("ms") {
            (1, 2)
        } else {
            match rest.chars().next()? {
                'd' => (86_400_000, 1),
                'h' => (3_600_000, 1),
                'm' => (60_000, 1),
                's' => (1_000, 1),
                _ => return None,
            }
        };
        rest = &rest[len..];

        let part = Duration::from_millis(count.checked_mul(unit_ms)?);
        total = total.checked_add(part)?;
    }

    (!total.is_zero()).then_some(total)
}
