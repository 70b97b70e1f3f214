//! Durable log sink behavior through the client's Log operation

use chrono::NaiveDateTime;
use wosbus::BusClient;

#[test]
fn records_land_in_emission_order_with_non_decreasing_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("wos.log");
    let client = BusClient::with_log_path(&log_path);

    for i in 0..10 {
        client.log(&format!("[probe] event {i}"));
    }

    let contents = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 10);

    let mut previous: Option<NaiveDateTime> = None;
    for (i, line) in lines.iter().enumerate() {
        assert!(
            line.ends_with(&format!("[probe] event {i}")),
            "line {i} out of order: {line}"
        );

        let stamp = line.splitn(3, ' ').take(2).collect::<Vec<_>>().join(" ");
        let parsed = NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d %H:%M:%S%.3f")
            .unwrap_or_else(|e| panic!("unparseable timestamp in line {i:?}: {e}"));
        if let Some(prev) = previous {
            assert!(parsed >= prev, "timestamps must be non-decreasing");
        }
        previous = Some(parsed);
    }
}

#[test]
fn log_survives_an_unwritable_sink_path() {
    let dir = tempfile::tempdir().unwrap();
    // The directory itself cannot be opened as an append-mode file.
    let client = BusClient::with_log_path(dir.path());

    // Console-only operation; must not panic or error.
    client.log("[probe] still alive");
}
