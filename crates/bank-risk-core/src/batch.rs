use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ErrorKind;
use crate::RiskEngineResult;

/// A record the batch could not compute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    pub record_id: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Successful results in input order, plus the records that were skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome<T> {
    pub results: Vec<T>,
    pub failures: Vec<RecordFailure>,
}

impl<T> BatchOutcome<T> {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fan `compute` out over `records` with rayon.
///
/// Validation and insufficient-data errors are collected against the
/// record's id; any other error aborts the whole batch. The closure gets the
/// record's position so callers can derive per-record seeds.
pub fn run_batch<R, T, F, Id>(
    context: &str,
    records: &[R],
    record_id: Id,
    compute: F,
) -> RiskEngineResult<BatchOutcome<T>>
where
    R: Sync,
    T: Send,
    F: Fn(usize, &R) -> RiskEngineResult<T> + Sync,
    Id: Fn(&R) -> String,
{
    let computed: Vec<RiskEngineResult<T>> = records
        .par_iter()
        .enumerate()
        .map(|(i, r)| compute(i, r))
        .collect();

    let mut results = Vec::with_capacity(records.len());
    let mut failures = Vec::new();
    for (record, outcome) in records.iter().zip(computed) {
        match outcome {
            Ok(v) => results.push(v),
            Err(e) if e.is_record_level() => {
                let id = record_id(record);
                warn!(context, record_id = %id, error = %e, "record skipped");
                failures.push(RecordFailure {
                    record_id: id,
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        context,
        computed = results.len(),
        failed = failures.len(),
        "batch complete"
    );
    Ok(BatchOutcome { results, failures })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RiskEngineError;

    #[test]
    fn test_collects_record_level_failures_in_order() {
        let records = vec![1_i32, -2, 3, -4, 5];
        let out = run_batch(
            "squares",
            &records,
            |r| format!("rec-{r}"),
            |_, r| {
                if *r < 0 {
                    Err(RiskEngineError::invalid("value", "negative"))
                } else {
                    Ok(r * r)
                }
            },
        )
        .unwrap();
        assert_eq!(out.results, vec![1, 9, 25]);
        assert_eq!(out.failures.len(), 2);
        assert_eq!(out.failures[0].record_id, "rec--2");
        assert_eq!(out.failures[0].kind, ErrorKind::Validation);
        assert!(!out.is_clean());
    }

    #[test]
    fn test_configuration_error_aborts() {
        let records = vec![1, 2, 3];
        let err = run_batch(
            "cfg",
            &records,
            |r| r.to_string(),
            |_, r| {
                if *r == 2 {
                    Err(RiskEngineError::Configuration("missing weight".into()))
                } else {
                    Ok(*r)
                }
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_index_passed_to_closure() {
        let records = vec!["a", "b", "c"];
        let out = run_batch("idx", &records, |r| r.to_string(), |i, _| Ok(i)).unwrap();
        assert_eq!(out.results, vec![0, 1, 2]);
        assert!(out.is_clean());
    }
}
