use prompt_core::RegisteredExporter;
use std::borrow::Cow;
use std::fmt::Write;
use std::sync::Arc;

pub const ERRORS_METRIC: &str = "prompt_errors_total";

/// Formats the per-exporter error counters in the text exposition format.
pub struct SelfMetrics;

impl SelfMetrics {
    pub fn format(exporters: &[Arc<RegisteredExporter>]) -> String {
        let mut out = format!("# TYPE {} counter\n", ERRORS_METRIC);
        for exporter in exporters {
            let _ = writeln!(
                out,
                "{}{{exporter=\"{}\"}} {}",
                ERRORS_METRIC,
                escape_label_value(exporter.name()),
                exporter.error_count()
            );
        }
        out
    }
}

fn escape_label_value(value: &str) -> Cow<'_, str> {
    if !value.contains(['\\', '"', '\n']) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}
