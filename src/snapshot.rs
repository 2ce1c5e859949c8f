use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::Context;

use crate::models::EventRecord;

/// Reads a JSON array of event documents.
pub fn load_snapshot(path: &Path) -> anyhow::Result<Vec<EventRecord>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open snapshot {}", path.display()))?;
    let events: Vec<EventRecord> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse snapshot {}", path.display()))?;
    tracing::info!(count = events.len(), path = %path.display(), "loaded event snapshot");
    Ok(events)
}

pub fn write_snapshot(path: &Path, events: &[EventRecord]) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create snapshot {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, events)
        .with_context(|| format!("failed to write snapshot {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STORE_EXPORT: &str = r#"[
        {
            "id": "evt-1",
            "title": "Robotics Night",
            "date": "15/03/2024",
            "time": "18:30",
            "imageBase64": "iVBORw0KGgo=",
            "enrolledStudents": ["ana@campus.edu", "li@campus.edu"],
            "organizerId": "admin-7",
            "categories": ["Technology"]
        },
        { "id": "evt-2" }
    ]"#;

    #[test]
    fn reads_store_documents_with_missing_fields() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("events.json");
        std::fs::write(&path, STORE_EXPORT).expect("write fixture");

        let events = load_snapshot(&path).expect("load snapshot");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].organizer_id, "admin-7");
        assert_eq!(events[0].enrollment_count(), 2);
        assert!(events[1].categories.is_empty());
        assert!(!events[1].predicted_popular);
    }

    #[test]
    fn writes_flags_under_store_field_names() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("annotated.json");
        let events = vec![EventRecord {
            id: "evt-1".to_string(),
            predicted_popular: true,
            ..EventRecord::default()
        }];

        write_snapshot(&path, &events).expect("write snapshot");
        let raw = std::fs::read_to_string(&path).expect("read back");

        assert!(raw.contains("\"predictedPopular\": true"));
        assert_eq!(load_snapshot(&path).expect("reload"), events);
    }

    #[test]
    fn reports_the_failing_path() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("missing.json");

        let err = load_snapshot(&path).unwrap_err();

        assert!(format!("{err:#}").contains("missing.json"));
    }
}
