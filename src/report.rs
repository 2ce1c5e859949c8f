use std::collections::HashMap;
use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::models::{CategorySummary, EventRecord, OrganizerSummary};
use crate::{popularity, schedule};

pub fn summarize_by_category<'a>(
    events: impl IntoIterator<Item = &'a EventRecord>,
) -> Vec<CategorySummary> {
    let mut map: HashMap<&str, (usize, usize)> = HashMap::new();

    for event in events {
        for category in &event.categories {
            let entry = map.entry(category.as_str()).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += event.enrollment_count();
        }
    }

    let mut summaries: Vec<CategorySummary> = map
        .into_iter()
        .map(|(category, (event_count, enrolled))| CategorySummary {
            category: category.to_string(),
            event_count,
            avg_enrollment: enrolled as f64 / event_count as f64,
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.event_count
            .cmp(&a.event_count)
            .then_with(|| a.category.cmp(&b.category))
    });
    summaries
}

pub fn summarize_by_organizer<'a>(
    events: impl IntoIterator<Item = &'a EventRecord>,
) -> Vec<OrganizerSummary> {
    let mut map: HashMap<&str, (usize, usize)> = HashMap::new();

    for event in events
        .into_iter()
        .filter(|event| !event.organizer_id.is_empty())
    {
        let entry = map.entry(event.organizer_id.as_str()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += event.enrollment_count();
    }

    let mut summaries: Vec<OrganizerSummary> = map
        .into_iter()
        .map(|(organizer_id, (event_count, enrolled))| OrganizerSummary {
            organizer_id: organizer_id.to_string(),
            event_count,
            avg_enrollment: enrolled as f64 / event_count as f64,
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.avg_enrollment
            .partial_cmp(&a.avg_enrollment)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.organizer_id.cmp(&b.organizer_id))
    });
    summaries
}

/// Scores against the whole snapshot, then narrows every section to
/// `category` when one is given.
pub fn build_report(
    category: Option<&str>,
    now: NaiveDateTime,
    events: &[EventRecord],
) -> String {
    let in_scope = |event: &EventRecord| {
        category.map_or(true, |wanted| event.categories.iter().any(|c| c == wanted))
    };
    let ranked: Vec<_> = popularity::rank_snapshot(events)
        .into_iter()
        .filter(|scored| in_scope(&scored.event))
        .collect();
    let scoped: Vec<&EventRecord> = events.iter().filter(|&event| in_scope(event)).collect();
    let categories = summarize_by_category(scoped.iter().copied());
    let organizers = summarize_by_organizer(scoped.iter().copied());

    let mut output = String::new();
    let scope_label = category.unwrap_or("all categories");

    let _ = writeln!(output, "# Campus Event Trends Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} events, as of {})",
        scope_label,
        scoped.len(),
        now.format("%d/%m/%Y %H:%M")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Mix");

    if categories.is_empty() {
        let _ = writeln!(output, "No categorized events in this snapshot.");
    } else {
        for summary in categories.iter() {
            let _ = writeln!(
                output,
                "- {}: {} events (avg enrollment {:.1})",
                summary.category, summary.event_count, summary.avg_enrollment
            );
        }
    }

    let trending: Vec<_> = ranked
        .iter()
        .filter(|scored| scored.breakdown.popular)
        .filter(|scored| {
            !schedule::is_event_in_past(&scored.event.date, &scored.event.time, now)
        })
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Trending Events");

    if trending.is_empty() {
        let _ = writeln!(output, "No upcoming events are predicted to trend.");
    } else {
        for scored in trending.iter().take(10) {
            let b = &scored.breakdown;
            let _ = writeln!(
                output,
                "- {} on {} at {} score {:.2} (category {:.2}, organizer {:.2}, time {:.1}, day {:.1}) with {} enrolled",
                display_title(&scored.event),
                scored.event.date,
                scored.event.time,
                b.total,
                b.category,
                b.organizer,
                b.time,
                b.day,
                scored.event.enrollment_count()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Organizers");

    if organizers.is_empty() {
        let _ = writeln!(output, "No organizers recorded in this snapshot.");
    } else {
        for summary in organizers.iter().take(10) {
            let _ = writeln!(
                output,
                "- {}: {} events (avg enrollment {:.1})",
                summary.organizer_id, summary.event_count, summary.avg_enrollment
            );
        }
    }

    output
}

pub fn display_title(event: &EventRecord) -> &str {
    if event.title.is_empty() {
        &event.id
    } else {
        &event.title
    }
}
