use std::num::ParseIntError;

use chrono::{Datelike, NaiveDate, Weekday};
use thiserror::Error;
use tracing::debug;

use crate::calendar;
use crate::models::{EventRecord, PopularityBreakdown, ScoredEvent};

pub const CATEGORY_WEIGHT: f64 = 0.4;
pub const ORGANIZER_WEIGHT: f64 = 0.3;
pub const TIME_WEIGHT: f64 = 0.2;
pub const DAY_WEIGHT: f64 = 0.1;
/// Totals strictly above this value are flagged as popular.
pub const POPULARITY_THRESHOLD: f64 = 1.5;

/// Score for a category or organizer that no other event shares yet.
pub const NO_HISTORY_SCORE: f64 = 5.0;
/// Score for an event with no categories or no organizer at all.
pub const UNSPECIFIED_SCORE: f64 = 3.0;
pub const NEUTRAL_MULTIPLIER: f64 = 1.0;

/// Malformed scheduling fields. These never leave this module: each one
/// degrades the affected signal to [`NEUTRAL_MULTIPLIER`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("time {raw:?} does not start with an hour")]
    InvalidHour {
        raw: String,
        #[source]
        source: ParseIntError,
    },
    #[error("date {raw:?} does not start with dd/MM/yyyy")]
    InvalidDate { raw: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopularityWeights {
    pub category: f64,
    pub organizer: f64,
    pub time: f64,
    pub day: f64,
    pub threshold: f64,
}

impl Default for PopularityWeights {
    fn default() -> Self {
        Self {
            category: CATEGORY_WEIGHT,
            organizer: ORGANIZER_WEIGHT,
            time: TIME_WEIGHT,
            day: DAY_WEIGHT,
            threshold: POPULARITY_THRESHOLD,
        }
    }
}

pub fn predict_popularity(event: &EventRecord, all_events: &[EventRecord]) -> bool {
    score_event(event, all_events).popular
}

pub fn score_event(event: &EventRecord, all_events: &[EventRecord]) -> PopularityBreakdown {
    score_event_with(event, all_events, PopularityWeights::default())
}

pub fn score_event_with(
    event: &EventRecord,
    all_events: &[EventRecord],
    weights: PopularityWeights,
) -> PopularityBreakdown {
    let category = category_score(event, all_events);
    let organizer = organizer_score(event, all_events);
    let time = time_score(&event.time);
    let day = day_score(&event.date);

    let total = category * weights.category
        + organizer * weights.organizer
        + time * weights.time
        + day * weights.day;
    let popular = total > weights.threshold;

    debug!(
        event_id = %event.id,
        title = %event.title,
        category,
        organizer,
        time,
        day,
        total,
        popular,
        "scored event"
    );

    PopularityBreakdown {
        category,
        organizer,
        time,
        day,
        total,
        popular,
    }
}

/// Scores every event against the same snapshot and returns annotated
/// copies in input order.
pub fn annotate_snapshot(events: &[EventRecord]) -> Vec<EventRecord> {
    events
        .iter()
        .map(|event| EventRecord {
            predicted_popular: predict_popularity(event, events),
            ..event.clone()
        })
        .collect()
}

/// Popular events first, then by descending total.
pub fn rank_snapshot(events: &[EventRecord]) -> Vec<ScoredEvent> {
    let mut scored: Vec<ScoredEvent> = events
        .iter()
        .map(|event| {
            let breakdown = score_event(event, events);
            ScoredEvent {
                event: EventRecord {
                    predicted_popular: breakdown.popular,
                    ..event.clone()
                },
                breakdown,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.breakdown.popular.cmp(&a.breakdown.popular).then_with(|| {
            b.breakdown
                .total
                .partial_cmp(&a.breakdown.total)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    });
    scored
}

pub fn category_score(event: &EventRecord, all_events: &[EventRecord]) -> f64 {
    if event.categories.is_empty() {
        return UNSPECIFIED_SCORE;
    }

    let per_label: Vec<f64> = event
        .categories
        .iter()
        .map(|category| {
            mean_enrollment(
                others(event, all_events).filter(|other| other.categories.contains(category)),
            )
            .unwrap_or(NO_HISTORY_SCORE)
        })
        .collect();

    per_label.iter().sum::<f64>() / per_label.len() as f64
}

pub fn organizer_score(event: &EventRecord, all_events: &[EventRecord]) -> f64 {
    if event.organizer_id.is_empty() {
        return UNSPECIFIED_SCORE;
    }

    mean_enrollment(
        others(event, all_events).filter(|other| other.organizer_id == event.organizer_id),
    )
    .unwrap_or(NO_HISTORY_SCORE)
}

pub fn time_score(time: &str) -> f64 {
    match parse_hour(time) {
        Ok(17..=20) => 1.5,
        Ok(12..=14) => 1.2,
        Ok(_) => NEUTRAL_MULTIPLIER,
        Err(err) => {
            debug!(error = %err, "falling back to neutral time score");
            NEUTRAL_MULTIPLIER
        }
    }
}

pub fn day_score(date: &str) -> f64 {
    match parse_date(date).map(|date| date.weekday()) {
        Ok(Weekday::Fri | Weekday::Sat) => 1.3,
        Ok(Weekday::Sun) => 1.2,
        Ok(_) => NEUTRAL_MULTIPLIER,
        Err(err) => {
            debug!(error = %err, "falling back to neutral day score");
            NEUTRAL_MULTIPLIER
        }
    }
}

/// Reads the hour from the first two characters of a time string.
pub fn parse_hour(time: &str) -> Result<i32, ParseError> {
    let prefix: String = time.chars().take(2).collect();
    prefix.parse().map_err(|source| ParseError::InvalidHour {
        raw: time.to_string(),
        source,
    })
}

/// Trailing text is ignored and overflowing days or months roll forward.
pub fn parse_date(date: &str) -> Result<NaiveDate, ParseError> {
    calendar::parse_date_prefix(date)
        .map(|(parsed, _)| parsed)
        .ok_or_else(|| ParseError::InvalidDate {
            raw: date.to_string(),
        })
}

fn others<'a>(
    event: &'a EventRecord,
    all_events: &'a [EventRecord],
) -> impl Iterator<Item = &'a EventRecord> + 'a {
    all_events.iter().filter(move |other| other.id != event.id)
}

fn mean_enrollment<'a>(events: impl Iterator<Item = &'a EventRecord>) -> Option<f64> {
    let (count, total) = events.fold((0usize, 0usize), |(count, total), event| {
        (count + 1, total + event.enrollment_count())
    });

    if count == 0 {
        None
    } else {
        Some(total as f64 / count as f64)
    }
}
