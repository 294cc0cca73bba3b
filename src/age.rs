// Exact age from a birth date, with an optional birth time

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::ToolError;

/// Elapsed time expressed in a single unit each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgeTotals {
    pub months: i64,
    pub weeks: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextBirthday {
    pub date: NaiveDate,
    pub days_until: i64,
    pub countdown: String,
}

/// Calendar breakdown of an age plus the derived facts shown next to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeReport {
    pub born: NaiveDateTime,
    pub formatted_dob: String,
    pub years: i64,
    pub months: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub totals: AgeTotals,
    pub weekday: String,
    pub next_birthday: NextBirthday,
    pub summary: String,
}

/// Parse `YYYY-MM-DD` and an optional `HH:MM` or `HH:MM:SS`; no time means midnight
pub fn parse_birth(date: &str, time: Option<&str>) -> Result<NaiveDateTime, ToolError> {
    let date = date.trim();
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ToolError::InvalidDate(date.to_string()))?;

    let time = match time.map(str::trim).filter(|t| !t.is_empty()) {
        None => NaiveTime::default(),
        Some(raw) => NaiveTime::parse_from_str(raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
            .map_err(|_| ToolError::InvalidTime(raw.to_string()))?,
    };
    Ok(day.and_time(time))
}

fn add_months(born: NaiveDateTime, months: i32) -> Result<NaiveDateTime, ToolError> {
    u32::try_from(months)
        .ok()
        .and_then(|m| born.checked_add_months(Months::new(m)))
        .ok_or(ToolError::DateOutOfRange)
}

/// The birthday in `year`; Feb 29 falls back to Feb 28 in common years
fn birthday_in(year: i32, born: NaiveDate) -> Result<NaiveDate, ToolError> {
    NaiveDate::from_ymd_opt(year, born.month(), born.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, born.month(), born.day() - 1))
        .ok_or(ToolError::DateOutOfRange)
}

fn next_birthday(born: NaiveDate, today: NaiveDate) -> Result<NextBirthday, ToolError> {
    let mut date = birthday_in(today.year(), born)?;
    if date < today {
        date = birthday_in(today.year() + 1, born)?;
    }
    let days_until = (date - today).num_days();
    let countdown = match days_until {
        0 => "Today!".to_string(),
        1 => "1 day".to_string(),
        n => format!("{n} days"),
    };
    Ok(NextBirthday {
        date,
        days_until,
        countdown,
    })
}

/// Age at `now`. Months are whole calendar months, clamped to the month's last day.
pub fn compute_age(born: NaiveDateTime, now: NaiveDateTime) -> Result<AgeReport, ToolError> {
    if born > now {
        return Err(ToolError::BirthInFuture(born.date().to_string()));
    }

    let mut whole_months =
        (now.year() - born.year()) * 12 + now.month() as i32 - born.month() as i32;
    let mut anchor = add_months(born, whole_months)?;
    if anchor > now {
        whole_months -= 1;
        anchor = add_months(born, whole_months)?;
    }

    let rest = now - anchor;
    let elapsed = now - born;
    let years = i64::from(whole_months / 12);
    let months = i64::from(whole_months % 12);
    let days = rest.num_days();

    Ok(AgeReport {
        born,
        formatted_dob: born.format("%B %-d, %Y").to_string(),
        years,
        months,
        days,
        hours: rest.num_hours() % 24,
        minutes: rest.num_minutes() % 60,
        seconds: rest.num_seconds() % 60,
        totals: AgeTotals {
            months: i64::from(whole_months),
            weeks: elapsed.num_weeks(),
            days: elapsed.num_days(),
            hours: elapsed.num_hours(),
            minutes: elapsed.num_minutes(),
            seconds: elapsed.num_seconds(),
        },
        weekday: born.format("%A").to_string(),
        next_birthday: next_birthday(born.date(), now.date())?,
        summary: format!("{years} years, {months} months and {days} days old"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        parse_birth(date, Some(time)).unwrap()
    }

    #[test]
    fn test_calendar_breakdown_and_totals() {
        let report = compute_age(at("1990-05-15", ""), at("2024-03-10", "12:30:45")).unwrap();
        assert_eq!(
            (report.years, report.months, report.days),
            (33, 9, 24)
        );
        assert_eq!((report.hours, report.minutes, report.seconds), (12, 30, 45));
        assert_eq!(
            report.totals,
            AgeTotals {
                months: 405,
                weeks: 1764,
                days: 12353,
                hours: 296484,
                minutes: 17789070,
                seconds: 1067344245,
            }
        );
        assert_eq!(report.weekday, "Tuesday");
        assert_eq!(report.formatted_dob, "May 15, 1990");
        assert_eq!(report.summary, "33 years, 9 months and 24 days old");
        assert_eq!(report.next_birthday.days_until, 66);
        assert_eq!(report.next_birthday.countdown, "66 days");
    }

    #[test]
    fn test_birth_time_not_yet_reached_today() {
        let report = compute_age(at("2000-06-01", "18:00"), at("2024-06-01", "09:00")).unwrap();
        assert_eq!((report.years, report.months, report.days), (23, 11, 30));
        assert_eq!(report.hours, 15);
        assert_eq!(report.next_birthday.countdown, "Today!");
    }

    #[test]
    fn test_leap_day_birthdays() {
        let report = compute_age(at("2000-02-29", ""), at("2023-03-01", "00:00")).unwrap();
        assert_eq!((report.years, report.months, report.days), (23, 0, 1));
        assert_eq!(report.next_birthday.date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(report.next_birthday.days_until, 365);

        let report = compute_age(at("2000-02-29", ""), at("2023-02-01", "00:00")).unwrap();
        assert_eq!(report.next_birthday.date, NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(parse_birth("15/05/1990", None), Err(ToolError::InvalidDate(_))));
        assert!(matches!(parse_birth("2023-02-30", None), Err(ToolError::InvalidDate(_))));
        assert!(matches!(
            parse_birth("1990-05-15", Some("25:00")),
            Err(ToolError::InvalidTime(_))
        ));
        assert_eq!(parse_birth("1990-05-15", Some(" ")).unwrap(), at("1990-05-15", "00:00"));

        let err = compute_age(at("2030-01-01", ""), at("2024-01-01", "")).unwrap_err();
        assert!(matches!(err, ToolError::BirthInFuture(_)));
    }
}
