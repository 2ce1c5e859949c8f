use chrono::{Duration, NaiveDateTime};

use crate::calendar;
use crate::models::EventRecord;

pub fn reminder_lead() -> Duration {
    Duration::hours(1)
}

pub fn event_start(date: &str, time: &str) -> Option<NaiveDateTime> {
    calendar::parse_start(date, time)
}

/// Unparsable schedules are never considered past.
pub fn is_event_in_past(date: &str, time: &str, now: NaiveDateTime) -> bool {
    event_start(date, time).is_some_and(|start| start < now)
}

pub fn active_events(events: &[EventRecord], now: NaiveDateTime) -> Vec<&EventRecord> {
    events
        .iter()
        .filter(|event| !is_event_in_past(&event.date, &event.time, now))
        .collect()
}

/// Expects an annotated snapshot; the stored flag is read as-is.
pub fn popular_active_events(events: &[EventRecord], now: NaiveDateTime) -> Vec<&EventRecord> {
    active_events(events, now)
        .into_iter()
        .filter(|event| event.predicted_popular)
        .collect()
}

pub fn finished_attended_events<'a>(
    events: &'a [EventRecord],
    email: &str,
    now: NaiveDateTime,
) -> Vec<&'a EventRecord> {
    events
        .iter()
        .filter(|event| {
            !event.date.trim().is_empty()
                && !event.time.trim().is_empty()
                && is_event_in_past(&event.date, &event.time, now)
                && event.attended_students.iter().any(|s| s == email)
        })
        .collect()
}

pub fn enrolled_events<'a>(events: &'a [EventRecord], email: &str) -> Vec<&'a EventRecord> {
    events.iter().filter(|event| event.is_enrolled(email)).collect()
}

/// When to remind an enrolled student, or `None` if that moment has passed.
pub fn reminder_time(event: &EventRecord, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let remind_at = event_start(&event.date, &event.time)? - reminder_lead();
    (remind_at > now).then_some(remind_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid timestamp")
    }

    fn scheduled(id: &str, date: &str, time: &str) -> EventRecord {
        EventRecord {
            id: id.to_string(),
            date: date.to_string(),
            time: time.to_string(),
            ..EventRecord::default()
        }
    }

    #[test]
    fn parses_store_formatted_start() {
        assert_eq!(event_start("15/03/2024", "18:30"), Some(at(15, 18, 30)));
        assert_eq!(event_start("2024-03-15", "18:30"), None);
        assert_eq!(event_start("15/03/2024", ""), None);
    }

    #[test]
    fn start_rolls_overflowing_dates_forward() {
        assert_eq!(event_start("31/02/2024", "18:00"), Some(at(2, 18, 0)));
    }

    #[test]
    fn past_detection_follows_rolled_over_dates() {
        // 32/02/2024 is 3 March, before the 5th.
        assert!(is_event_in_past("32/02/2024", "10:00", at(5, 9, 0)));
        assert!(!is_event_in_past("36/02/2024", "10:00", at(5, 9, 0)));
    }

    #[test]
    fn past_detection_tolerates_bad_input() {
        let now = at(15, 12, 0);
        assert!(is_event_in_past("14/03/2024", "09:00", now));
        assert!(!is_event_in_past("15/03/2024", "18:00", now));
        assert!(!is_event_in_past("", "", now));
    }

    #[test]
    fn popular_listing_skips_past_and_unflagged_events() {
        let now = at(15, 12, 0);
        let mut past = scheduled("past", "01/03/2024", "10:00");
        past.predicted_popular = true;
        let mut upcoming = scheduled("upcoming", "20/03/2024", "18:00");
        upcoming.predicted_popular = true;
        let quiet = scheduled("quiet", "21/03/2024", "09:00");
        let events = vec![past, upcoming, quiet];

        let ids: Vec<&str> = popular_active_events(&events, now)
            .iter()
            .map(|e| e.id.as_str())
            .collect();

        assert_eq!(ids, ["upcoming"]);
        assert_eq!(active_events(&events, now).len(), 2);
    }

    #[test]
    fn finished_listing_requires_attendance() {
        let now = at(15, 12, 0);
        let mut attended = scheduled("attended", "10/03/2024", "17:00");
        attended.attended_students = vec!["kai@campus.edu".to_string()];
        let mut missed = scheduled("missed", "11/03/2024", "17:00");
        missed.enrolled_students = vec!["kai@campus.edu".to_string()];
        let mut undated = scheduled("undated", "", "");
        undated.attended_students = vec!["kai@campus.edu".to_string()];
        let events = vec![attended, missed, undated];

        let finished = finished_attended_events(&events, "kai@campus.edu", now);

        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].id, "attended");
        assert_eq!(enrolled_events(&events, "kai@campus.edu")[0].id, "missed");
    }

    #[test]
    fn reminder_is_an_hour_before_start() {
        let event = scheduled("talk", "20/03/2024", "18:00");

        assert_eq!(reminder_time(&event, at(15, 12, 0)), Some(at(20, 17, 0)));
        assert_eq!(reminder_time(&event, at(20, 17, 30)), None);
        assert_eq!(reminder_time(&scheduled("x", "soon", ""), at(1, 0, 0)), None);
    }
}
