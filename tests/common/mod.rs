#![allow(dead_code)]

use std::io::Write;
use tempfile::NamedTempFile;

pub const ASSIGNMENTS: &str = "tests/fixtures/assignments.json";
pub const PAYMENTS: &str = "tests/fixtures/payments.json";

/// Writes `json` to a temporary file that lives as long as the handle.
pub fn json_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(json.as_bytes())
        .expect("Failed to write temp file");
    file
}

/// A bare assignment document with one line item per `(id, balance, mandatory)`.
pub fn assignment_json(items: &[(&str, &str, bool)]) -> String {
    let items: Vec<String> = items
        .iter()
        .map(|(id, balance, mandatory)| {
            format!(
                r#"{{"categoryId": "{id}", "categoryName": "{id}", "type": "{id}", "amount": {balance}, "balance": {balance}, "isMandatory": {mandatory}}}"#
            )
        })
        .collect();
    format!(r#"{{"feeItems": [{}]}}"#, items.join(", "))
}
