//! Lenient parsing of the store's `dd/MM/yyyy` dates and `HH:mm` times.
//!
//! Only a leading match is required and trailing text is ignored. Fields
//! that overflow roll forward the way a lenient calendar does, so
//! `31/02/2024` is 2 March 2024 and `00/01/2024` is 31 December 2023.

use chrono::{Days, Duration, Months, NaiveDate, NaiveDateTime};

/// Parses a leading `dd/MM/yyyy` date and returns it with the unparsed rest.
pub fn parse_date_prefix(input: &str) -> Option<(NaiveDate, &str)> {
    let (day, rest) = take_number(input)?;
    let rest = rest.strip_prefix('/')?;
    let (month, rest) = take_number(rest)?;
    let rest = rest.strip_prefix('/')?;
    let (year, rest) = take_number(rest)?;

    let date = roll_date(i32::try_from(year).ok()?, month, day)?;
    Some((date, rest))
}

/// Parses `"{date} {time}"` as `dd/MM/yyyy HH:mm`, with the same leniency
/// applied to both halves.
pub fn parse_start(date: &str, time: &str) -> Option<NaiveDateTime> {
    let combined = format!("{date} {time}");
    let (day, rest) = parse_date_prefix(&combined)?;

    let rest = rest.trim_start();
    let (hour, rest) = take_number(rest)?;
    let rest = rest.strip_prefix(':')?;
    let (minute, _) = take_number(rest)?;

    let offset = Duration::try_hours(hour)? + Duration::try_minutes(minute)?;
    day.and_hms_opt(0, 0, 0)?.checked_add_signed(offset)
}

/// Counts `month` and `day` forward from 1 January of `year`.
fn roll_date(year: i32, month: i64, day: i64) -> Option<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let months = month - 1;
    let with_months = if months >= 0 {
        start.checked_add_months(Months::new(u32::try_from(months).ok()?))?
    } else {
        start.checked_sub_months(Months::new(u32::try_from(-months).ok()?))?
    };

    let days = day - 1;
    if days >= 0 {
        with_months.checked_add_days(Days::new(u64::try_from(days).ok()?))
    } else {
        with_months.checked_sub_days(Days::new(u64::try_from(-days).ok()?))
    }
}

fn take_number(input: &str) -> Option<(i64, &str)> {
    let end = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    if end == 0 {
        return None;
    }
    let value = input[..end].parse().ok()?;
    Some((value, &input[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[rstest]
    #[case("16/03/2024", ymd(2024, 3, 16))]
    #[case("16/3/2024", ymd(2024, 3, 16))]
    #[case("31/02/2024", ymd(2024, 3, 2))]
    #[case("29/02/2023", ymd(2023, 3, 1))]
    #[case("00/01/2024", ymd(2023, 12, 31))]
    #[case("15/13/2024", ymd(2025, 1, 15))]
    #[case("01/00/2024", ymd(2023, 12, 1))]
    fn rolls_overflowing_fields_forward(#[case] raw: &str, #[case] expected: NaiveDate) {
        assert_eq!(parse_date_prefix(raw).map(|(date, _)| date), Some(expected));
    }

    #[test]
    fn keeps_trailing_text_as_remainder() {
        assert_eq!(
            parse_date_prefix("16/03/2024 10:00"),
            Some((ymd(2024, 3, 16), " 10:00"))
        );
    }

    #[rstest]
    #[case("")]
    #[case("2024-03-15")]
    #[case("16/03")]
    #[case("x16/03/2024")]
    #[case("99/99/99999999999")]
    fn rejects_inputs_without_a_date_prefix(#[case] raw: &str) {
        assert_eq!(parse_date_prefix(raw), None);
    }

    #[test]
    fn start_rolls_hours_past_midnight() {
        let expected = ymd(2024, 3, 17).and_hms_opt(1, 15, 0);
        assert_eq!(parse_start("16/03/2024", "25:15"), expected);
    }

    #[test]
    fn start_takes_the_first_time_after_the_date() {
        let expected = ymd(2024, 3, 16).and_hms_opt(10, 0, 0);
        assert_eq!(parse_start("16/03/2024 10:00", "18:00"), expected);
    }

    #[test]
    fn start_needs_a_time() {
        assert_eq!(parse_start("16/03/2024", ""), None);
        assert_eq!(parse_start("16/03/2024", "noon"), None);
    }
}
