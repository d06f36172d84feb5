use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;

mod common;
use common::{TestWorkspace, fixture_path};

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn suggest_keys_ranks_unique_columns_first() {
    let output = cargo_bin_cmd!("gridrecon")
        .args([
            "suggest-keys",
            "-i",
            fixture_path("people.csv").to_str().unwrap(),
        ])
        .output()
        .expect("run suggest-keys");
    assert!(output.status.success());

    let suggestions = stdout_json(&output);
    let first = &suggestions[0];
    // ID and Name are both fully unique; ID keeps its column-order rank.
    assert_eq!(first["column"], "ID");
    assert_eq!(first["uniqueness"], 1.0);
    let last = &suggestions[3];
    assert_eq!(last["column"], "Status");
    assert!(last["uniqueness"].as_f64().unwrap() < 0.5);
}

#[test]
fn map_columns_binds_exact_and_fuzzy_names() {
    let workspace = TestWorkspace::new();
    let target = workspace.write(
        "renamed.csv",
        "ID,Names,Town,Status\n1,Alice,New York,Active\n",
    );

    let output = cargo_bin_cmd!("gridrecon")
        .args([
            "map-columns",
            "--source",
            fixture_path("people.csv").to_str().unwrap(),
            "--target",
            target.to_str().unwrap(),
        ])
        .output()
        .expect("run map-columns");
    assert!(output.status.success());

    let proposal = stdout_json(&output);
    let matches = proposal["matches"].as_array().unwrap();
    assert_eq!(matches[0]["source"], "ID");
    assert_eq!(matches[0]["confidence"], 1.0);
    let name_match = matches
        .iter()
        .find(|m| m["source"] == "Name")
        .expect("Name binds fuzzily");
    assert_eq!(name_match["target"], "Names");
    assert!(name_match["confidence"].as_f64().unwrap() < 1.0);
    // "City" vs "Town" is below the similarity threshold.
    assert!(
        proposal["unmapped_sources"]
            .as_array()
            .unwrap()
            .contains(&Value::String("City".to_string()))
    );
}

#[test]
fn detect_header_proposes_the_text_rows() {
    let output = cargo_bin_cmd!("gridrecon")
        .args([
            "detect-header",
            "-i",
            fixture_path("multi_header.csv").to_str().unwrap(),
        ])
        .output()
        .expect("run detect-header");
    assert!(output.status.success());

    let detection = stdout_json(&output);
    assert_eq!(detection["header_rows"], serde_json::json!([0, 1]));
    let signals = detection["signals"].as_array().unwrap();
    assert_eq!(signals.len(), 4);
    assert!(signals[2]["score"].as_f64().unwrap() < 0.1);
}

#[test]
fn detect_header_on_numeric_sheet_finds_nothing() {
    let workspace = TestWorkspace::new();
    let numbers = workspace.write("numbers.csv", "1,2,3\n4,5,6\n");

    let output = cargo_bin_cmd!("gridrecon")
        .args(["detect-header", "-i", numbers.to_str().unwrap()])
        .output()
        .expect("run detect-header");
    assert!(output.status.success());

    let detection = stdout_json(&output);
    assert_eq!(detection["header_rows"], serde_json::json!([]));
}
