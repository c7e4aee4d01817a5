//! Flux query builder.
//!
//! Queries are assembled from discrete clause functions instead of
//! conditional string concatenation, so each optional filter can be
//! tested on its own. A clause function maps "value or absence" to
//! zero or one pipeline stages.

/// Filter clause on the measurement column.
pub fn measurement_clause(measurement: &str) -> String {
    format!(
        r#"filter(fn: (r) => r._measurement == "{}")"#,
        measurement
    )
}

/// Filter clause selecting a set of fields. Empty input selects nothing
/// extra, so no clause is emitted.
pub fn field_clause(fields: &[String]) -> Option<String> {
    if fields.is_empty() {
        return None;
    }
    let predicate = fields
        .iter()
        .map(|f| format!(r#"r._field == "{}""#, f))
        .collect::<Vec<_>>()
        .join(" or ");
    Some(format!("filter(fn: (r) => {})", predicate))
}

/// Filter clause on an arbitrary tag. Absent value means no clause.
pub fn tag_clause(key: &str, value: Option<&str>) -> Option<String> {
    value.map(|v| format!(r#"filter(fn: (r) => r.{} == "{}")"#, key, v))
}

/// Builder for one pipeline-style query.
#[derive(Debug, Clone)]
pub struct FluxQuery {
    bucket: String,
    range_start: String,
    range_stop: Option<String>,
    stages: Vec<String>,
}

impl FluxQuery {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            range_start: "-5m".to_string(),
            range_stop: None,
            stages: Vec::new(),
        }
    }

    /// Set the range start (e.g. "-30s", "-1h", or an RFC 3339 instant).
    pub fn range(mut self, start: &str) -> Self {
        self.range_start = start.to_string();
        self
    }

    /// Set an explicit range stop.
    pub fn range_stop(mut self, stop: &str) -> Self {
        self.range_stop = Some(stop.to_string());
        self
    }

    pub fn measurement(mut self, measurement: &str) -> Self {
        self.stages.push(measurement_clause(measurement));
        self
    }

    pub fn fields(mut self, fields: &[String]) -> Self {
        if let Some(clause) = field_clause(fields) {
            self.stages.push(clause);
        }
        self
    }

    pub fn tag(mut self, key: &str, value: Option<&str>) -> Self {
        if let Some(clause) = tag_clause(key, value) {
            self.stages.push(clause);
        }
        self
    }

    /// Downsample into fixed windows with the given aggregate function.
    pub fn aggregate_window(mut self, every: &str, func: &str) -> Self {
        self.stages.push(format!(
            "aggregateWindow(every: {}, fn: {}, createEmpty: false)",
            every, func
        ));
        self
    }

    /// Reshape one-row-per-field output into one column per field.
    pub fn pivot(mut self) -> Self {
        self.stages.push(
            r#"pivot(rowKey: ["_time"], columnKey: ["_field"], valueColumn: "_value")"#
                .to_string(),
        );
        self
    }

    /// Keep only the most recent row per series.
    pub fn last(mut self) -> Self {
        self.stages.push("last()".to_string());
        self
    }

    pub fn limit(mut self, n: u32) -> Self {
        self.stages.push(format!("limit(n: {})", n));
        self
    }

    /// Render the query text.
    pub fn build(&self) -> String {
        let range = match &self.range_stop {
            Some(stop) => format!("range(start: {}, stop: {})", self.range_start, stop),
            None => format!("range(start: {})", self.range_start),
        };

        let mut out = format!("from(bucket: \"{}\")\n  |> {}", self.bucket, range);
        for stage in &self.stages {
            out.push_str("\n  |> ");
            out.push_str(stage);
        }
        out
    }
}
