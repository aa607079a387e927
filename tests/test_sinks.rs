use option_chain_sync::chain::{ExpiryTable, NormalizedRow, SideQuote};
use option_chain_sync::sink::csv::write_table;
use option_chain_sync::sink::{CsvSink, SinkError, TableSink};

// ── Helpers ─────────────────────────────────────────────────────────

fn table(strikes: &[f64]) -> ExpiryTable {
    let call = SideQuote {
        open_interest: Some(120.0),
        ..Default::default()
    };
    let rows = strikes
        .iter()
        .map(|s| NormalizedRow::from_sides(*s, Some(&call), None))
        .collect();
    ExpiryTable::from_rows("09-Dec-2025", rows)
}

fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

// ── CSV ─────────────────────────────────────────────────────────────

#[test]
fn test_header_in_column_order() {
    let mut buf = Vec::new();
    write_table(&mut buf, &table(&[18000.0])).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Strike,CE OI,CE Chg OI,CE LTP,CE Volume,PE LTP,PE Chg OI,PE OI,PE Volume"
    );
    let row: Vec<f64> = lines
        .next()
        .unwrap()
        .split(',')
        .map(|c| c.parse().unwrap())
        .collect();
    assert_eq!(row, vec![18000.0, 120.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    assert!(text.lines().nth(1).unwrap().starts_with("18000,"));
    assert!(lines.next().is_none());
}

#[test]
fn test_empty_table_writes_header_only() {
    let mut buf = Vec::new();
    write_table(&mut buf, &table(&[])).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
}

#[tokio::test]
async fn test_csv_sink_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out");
    let dest_id = dest.to_str().unwrap();
    let sink = CsvSink::new();

    sink.write(dest_id, "Weekly", &table(&[100.0, 200.0, 300.0]))
        .await
        .unwrap();
    let path = CsvSink::file_path(dest_id, "Weekly");
    assert_eq!(path, dest.join("weekly.csv"));
    assert_eq!(read_lines(&path).len(), 4);

    // Smaller table replaces, never appends
    sink.write(dest_id, "Weekly", &table(&[150.0])).await.unwrap();
    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("150"));

    // Same table twice leaves the file identical
    let before = std::fs::read(&path).unwrap();
    sink.write(dest_id, "Weekly", &table(&[150.0])).await.unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn test_fractional_strike_keeps_decimals() {
    let mut buf = Vec::new();
    write_table(&mut buf, &table(&[17.5])).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.lines().nth(1).unwrap().starts_with("17.5,"));
}

#[tokio::test]
async fn test_csv_sink_leaves_no_staging_file() {
    let dir = tempfile::tempdir().unwrap();
    let dest_id = dir.path().to_str().unwrap();

    CsvSink::new().write(dest_id, "Weekly", &table(&[1.0])).await.unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["weekly.csv".to_string()]);
}

#[tokio::test]
async fn test_failed_csv_write_keeps_previous_file() {
    let dir = tempfile::tempdir().unwrap();
    let dest_id = dir.path().to_str().unwrap();
    let sink = CsvSink::new();

    sink.write(dest_id, "Weekly", &table(&[100.0, 200.0])).await.unwrap();
    let path = CsvSink::file_path(dest_id, "Weekly");
    let before = std::fs::read(&path).unwrap();

    // A directory squatting on the staging path makes the write fail.
    std::fs::create_dir(path.with_extension("csv.tmp")).unwrap();
    let err = sink.write(dest_id, "Weekly", &table(&[300.0])).await.unwrap_err();
    assert!(matches!(err, SinkError::Io { .. }));
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn test_csv_sink_one_file_per_table() {
    let dir = tempfile::tempdir().unwrap();
    let dest_id = dir.path().to_str().unwrap();
    let sink = CsvSink::new();

    sink.write(dest_id, "Weekly", &table(&[1.0])).await.unwrap();
    sink.write(dest_id, "Next Week", &table(&[1.0, 2.0])).await.unwrap();

    assert!(dir.path().join("weekly.csv").exists());
    assert_eq!(read_lines(&dir.path().join("next_week.csv")).len(), 3);
}
