//! Tests for listing rendering.

use super::*;
use serde_json::json;

#[test]
fn test_table_has_header_and_rows() {
    let listing = Listing::new(&["ID", "TTL", "Age"])
        .with_row(vec![json!("a1"), json!(300), json!(4)])
        .with_row(vec![json!("b2"), json!(60), json!(0)]);

    let table = listing.render(OutputFormat::Table);
    let lines: Vec<&str> = table.lines().collect();
    assert!(lines[0].contains("ID"));
    assert!(lines[0].contains("TTL"));
    assert!(table.contains("a1"));
    assert!(table.contains("300"));
    assert!(!table.contains("\"a1\""));
}

#[test]
fn test_empty_listing_still_renders_columns() {
    let listing = Listing::new(&["id", "ttl", "age"]);
    assert!(listing.is_empty());

    let table = listing.render(OutputFormat::Table);
    assert!(table.contains("id"));
    assert!(table.contains("ttl"));

    assert_eq!(listing.render(OutputFormat::Json), "[]");
}

#[test]
fn test_json_records_are_keyed_by_column() {
    let listing = Listing::new(&["Name", "Metadata"]).with_row(vec![
        json!("fizbit"),
        json!({"owner": "ops"}),
    ]);

    let rendered: Value = serde_json::from_str(&listing.render(OutputFormat::Json)).unwrap();
    assert_eq!(
        rendered,
        json!([{"Name": "fizbit", "Metadata": {"owner": "ops"}}])
    );
}

#[test]
fn test_cells_render_bare_strings_and_compact_json() {
    assert_eq!(cell(&json!("text")), "text");
    assert_eq!(cell(&json!(null)), "");
    assert_eq!(cell(&json!({"a": 1})), "{\"a\":1}");
    assert_eq!(cell(&json!(true)), "true");
}
