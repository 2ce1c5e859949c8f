use anyhow::Context;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::EventRecord;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let events = vec![
        seed_event(
            "seed-robotics-night",
            "Robotics Night",
            "Engineering Hall 204",
            "23/10/2026",
            "18:30",
            "admin-ops",
            &["Technology", "Social"],
            &["avery.lee@campus.edu", "jules.moreno@campus.edu", "kiara.patel@campus.edu"],
        ),
        seed_event(
            "seed-career-fair",
            "Autumn Career Fair",
            "Student Union Ballroom",
            "28/10/2026",
            "12:00",
            "admin-careers",
            &["Career"],
            &["avery.lee@campus.edu", "sam.okafor@campus.edu"],
        ),
        seed_event(
            "seed-resume-clinic",
            "Resume Clinic",
            "Library Room 3",
            "03/11/2026",
            "09:00",
            "admin-careers",
            &["Career", "Workshop"],
            &["jules.moreno@campus.edu"],
        ),
        seed_event(
            "seed-open-mic",
            "Open Mic",
            "Campus Cafe",
            "",
            "",
            "",
            &[],
            &[],
        ),
    ];

    for event in &events {
        upsert_event(pool, event, true).await?;
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn seed_event(
    id: &str,
    title: &str,
    room: &str,
    date: &str,
    time: &str,
    organizer_id: &str,
    categories: &[&str],
    enrolled: &[&str],
) -> EventRecord {
    EventRecord {
        id: id.to_string(),
        title: title.to_string(),
        room: room.to_string(),
        date: date.to_string(),
        time: time.to_string(),
        organizer_id: organizer_id.to_string(),
        categories: categories.iter().map(|c| c.to_string()).collect(),
        enrolled_students: enrolled.iter().map(|s| s.to_string()).collect(),
        ..EventRecord::default()
    }
}

/// Inserts or replaces an event. Existing attendance is only replaced when
/// `replace_attendance` is set.
pub async fn upsert_event(
    pool: &PgPool,
    event: &EventRecord,
    replace_attendance: bool,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO campus_events.events
        (id, title, room, event_date, event_time, description, organizer_id,
         categories, enrolled_students, attended_students)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (id) DO UPDATE
        SET title = EXCLUDED.title,
            room = EXCLUDED.room,
            event_date = EXCLUDED.event_date,
            event_time = EXCLUDED.event_time,
            description = EXCLUDED.description,
            organizer_id = EXCLUDED.organizer_id,
            categories = EXCLUDED.categories,
            enrolled_students = EXCLUDED.enrolled_students,
            attended_students = CASE
                WHEN $11 THEN EXCLUDED.attended_students
                ELSE campus_events.events.attended_students
            END
        "#,
    )
    .bind(&event.id)
    .bind(&event.title)
    .bind(&event.room)
    .bind(&event.date)
    .bind(&event.time)
    .bind(&event.description)
    .bind(&event.organizer_id)
    .bind(&event.categories)
    .bind(&event.enrolled_students)
    .bind(&event.attended_students)
    .bind(replace_attendance)
    .execute(pool)
    .await
    .with_context(|| format!("failed to upsert event {}", event.id))?;

    Ok(())
}

/// Reads the full event collection. The popularity flag is left unset;
/// callers annotate the snapshot themselves.
pub async fn fetch_events(pool: &PgPool) -> anyhow::Result<Vec<EventRecord>> {
    let rows = sqlx::query(
        "SELECT id, title, room, event_date, event_time, description, organizer_id, \
         categories, enrolled_students, attended_students \
         FROM campus_events.events \
         ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await
    .context("failed to fetch events")?;

    let mut events = Vec::with_capacity(rows.len());

    for row in rows {
        events.push(EventRecord {
            id: row.get("id"),
            title: row.get("title"),
            room: row.get("room"),
            date: row.get("event_date"),
            time: row.get("event_time"),
            description: row.get("description"),
            organizer_id: row.get("organizer_id"),
            categories: row.get("categories"),
            enrolled_students: row.get("enrolled_students"),
            attended_students: row.get("attended_students"),
            predicted_popular: false,
        });
    }

    tracing::info!(count = events.len(), "fetched event snapshot");
    Ok(events)
}

#[derive(Debug, serde::Deserialize)]
pub struct EventCsvRow {
    id: Option<String>,
    title: String,
    #[serde(default)]
    room: String,
    date: String,
    time: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    organizer_id: String,
    #[serde(default)]
    categories: String,
    #[serde(default)]
    enrolled_students: String,
    /// Absent or blank keeps whatever attendance is already stored.
    #[serde(default)]
    attended_students: Option<String>,
}

impl EventCsvRow {
    /// Returns the event and whether the row carries attendance.
    pub fn into_event(self) -> (EventRecord, bool) {
        let attended = self.attended_students.filter(|raw| !raw.trim().is_empty());
        let has_attendance = attended.is_some();
        let event = EventRecord {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("import-{}", Uuid::new_v4())),
            title: self.title,
            room: self.room,
            date: self.date,
            time: self.time,
            description: self.description,
            organizer_id: self.organizer_id,
            categories: split_list(&self.categories),
            enrolled_students: split_list(&self.enrolled_students),
            attended_students: attended.as_deref().map(split_list).unwrap_or_default(),
            predicted_popular: false,
        };
        (event, has_attendance)
    }
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut imported = 0usize;

    for result in reader.deserialize::<EventCsvRow>() {
        let (event, has_attendance) = result?.into_event();
        upsert_event(pool, &event, has_attendance).await?;
        imported += 1;
    }

    Ok(imported)
}

/// Splits a `;`-separated CSV cell, dropping blanks and duplicates.
pub fn split_list(raw: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for value in raw.split(';').map(str::trim).filter(|v| !v.is_empty()) {
        if !values.iter().any(|existing| existing == value) {
            values.push(value.to_string());
        }
    }
    values
}

const ENROLL_SQL: &str = r#"
    WITH target AS (
        SELECT id, $2 = ANY(enrolled_students) AS member
        FROM campus_events.events
        WHERE id = $1
        FOR UPDATE
    ),
    changed AS (
        UPDATE campus_events.events AS e
        SET enrolled_students = array_append(e.enrolled_students, $2)
        FROM target
        WHERE e.id = target.id AND NOT target.member
        RETURNING e.id
    )
    SELECT (SELECT count(*) FROM target) AS found,
           (SELECT count(*) FROM changed) AS changed
"#;

const UNENROLL_SQL: &str = r#"
    WITH target AS (
        SELECT id, $2 = ANY(enrolled_students) AS member
        FROM campus_events.events
        WHERE id = $1
        FOR UPDATE
    ),
    changed AS (
        UPDATE campus_events.events AS e
        SET enrolled_students = array_remove(e.enrolled_students, $2)
        FROM target
        WHERE e.id = target.id AND target.member
        RETURNING e.id
    )
    SELECT (SELECT count(*) FROM target) AS found,
           (SELECT count(*) FROM changed) AS changed
"#;

/// Returns `false` when the student was already enrolled.
pub async fn enroll(pool: &PgPool, event_id: &str, email: &str) -> anyhow::Result<bool> {
    update_enrollment(pool, ENROLL_SQL, event_id, email)
        .await
        .with_context(|| format!("failed to enroll {email} in {event_id}"))
}

/// Returns `false` when the student was not enrolled.
pub async fn unenroll(pool: &PgPool, event_id: &str, email: &str) -> anyhow::Result<bool> {
    update_enrollment(pool, UNENROLL_SQL, event_id, email)
        .await
        .with_context(|| format!("failed to unenroll {email} from {event_id}"))
}

async fn update_enrollment(
    pool: &PgPool,
    sql: &str,
    event_id: &str,
    email: &str,
) -> anyhow::Result<bool> {
    let row = sqlx::query(sql)
        .bind(event_id)
        .bind(email)
        .fetch_one(pool)
        .await?;

    enrollment_outcome(event_id, row.get("found"), row.get("changed"))
}

/// The existence check and the update run as one statement, so a missing
/// event is always reported as an error rather than a no-op.
fn enrollment_outcome(event_id: &str, found: i64, changed: i64) -> anyhow::Result<bool> {
    if found == 0 {
        anyhow::bail!("no event with id {event_id}");
    }
    Ok(changed > 0)
}

pub async fn delete_event(pool: &PgPool, event_id: &str) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM campus_events.events WHERE id = $1")
        .bind(event_id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to delete event {event_id}"))?;

    Ok(result.rows_affected() > 0)
}
