use std::time::{Duration, Instant};

/// Times a single store operation and emits one debug event when finished.
pub struct OperationGuard {
    op: &'static str,
    target: Option<String>,
    start: Instant,
}

impl OperationGuard {
    pub fn new(op: &'static str, target: Option<&str>) -> Self {
        OperationGuard {
            op,
            target: target.map(|t| t.to_string()),
            start: Instant::now(),
        }
    }

    pub fn finish(self, rows: usize, code: Option<&str>) {
        let latency = self.start.elapsed();
        record(self.op, self.target.as_deref(), latency, rows, code);
    }

    /// Finishes the guard from a result, counting rows with `rows_of` on success.
    pub fn finish_with<T, E>(
        self,
        result: &Result<T, E>,
        rows_of: impl FnOnce(&T) -> usize,
        code_of: impl FnOnce(&E) -> &'static str,
    ) {
        match result {
            Ok(value) => self.finish(rows_of(value), None),
            Err(err) => self.finish(0, Some(code_of(err))),
        }
    }
}

pub fn operation(op: &'static str, target: Option<&str>) -> OperationGuard {
    OperationGuard::new(op, target)
}

pub fn record(
    op: &'static str,
    target: Option<&str>,
    latency: Duration,
    rows: usize,
    code: Option<&str>,
) {
    tracing::debug!(
        target: "costline::store",
        op,
        target_id = target.unwrap_or("-"),
        latency_ms = latency.as_millis() as u64,
        rows,
        code = code.unwrap_or("OK"),
        "store operation"
    );
}
