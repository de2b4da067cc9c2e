pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use colored::Colorize;
use serde_json::Value;

/// A batch result inside the output envelope: computed records, skipped
/// records and the optional portfolio summary.
pub struct BatchView<'a> {
    pub results: &'a [Value],
    pub failures: &'a [Value],
    pub summary: Option<&'a Value>,
}

/// The batch carried by `value`'s `result`, if it is one.
pub fn batch_view(value: &Value) -> Option<BatchView<'_>> {
    let result = value.get("result")?;
    let results = result.get("results")?.as_array()?;
    let failures = result
        .get("failures")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    Some(BatchView {
        results,
        failures,
        summary: result.get("summary"),
    })
}

/// Dispatch output to the appropriate formatter. Formats that drop the
/// failure list still report the skipped count on stderr.
pub fn format_output(format: &OutputFormat, value: &Value) {
    let batch = batch_view(value);
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value, batch.as_ref()),
        OutputFormat::Csv => csv_out::print_csv(value, batch.as_ref()),
        OutputFormat::Minimal => minimal::print_minimal(value, batch.as_ref()),
    }
    if let Some(b) = batch.filter(|b| !b.failures.is_empty()) {
        if !matches!(format, OutputFormat::Json | OutputFormat::Table) {
            eprintln!(
                "{}: {} record(s) skipped; use --output json for details",
                "warning".yellow().bold(),
                b.failures.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_batch_view_of_credit_output() {
        let v = json!({
            "result": {
                "results": [{"exposure_id": "A"}],
                "failures": [{"record_id": "B"}],
                "summary": {"total_rwa": "10"}
            }
        });
        let b = batch_view(&v).unwrap();
        assert_eq!(b.results.len(), 1);
        assert_eq!(b.failures.len(), 1);
        assert!(b.summary.is_some());
    }

    #[test]
    fn test_single_result_is_not_a_batch() {
        let v = json!({ "result": { "pd": "0.02" } });
        assert!(batch_view(&v).is_none());
        assert!(batch_view(&json!([1, 2])).is_none());
    }
}
