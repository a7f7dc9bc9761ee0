//! Plain-text event formatter that tags each line with the fields of its outermost span.
//!
//! Waterfall runs open a `waterfall{run_id=..}` span, so every attempt logged during a run
//! carries the same `run_id` in the log file.

use std::fmt;

use tracing_core::Subscriber;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{FmtContext, FormattedFields};
use tracing_subscriber::registry::LookupSpan;

/// Output: `TIMESTAMP [root_span_fields] LEVEL target: event_fields`. The bracket is omitted
/// outside any span or when the root span has no fields.
pub struct RunScopedFormat {
    timer: SystemTime,
    with_target: bool,
}

impl Default for RunScopedFormat {
    fn default() -> Self {
        Self {
            timer: SystemTime,
            with_target: true,
        }
    }
}

impl RunScopedFormat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, on: bool) -> Self {
        self.with_target = on;
        self
    }
}

impl<S, N> FormatEvent<S, N> for RunScopedFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing_core::Event<'_>,
    ) -> fmt::Result {
        self.timer.format_time(&mut writer)?;
        if let Some(root) = ctx.event_scope().and_then(|scope| scope.from_root().next()) {
            let extensions = root.extensions();
            if let Some(fields) = extensions
                .get::<FormattedFields<N>>()
                .filter(|f| !f.fields.is_empty())
            {
                write!(writer, " [{}]", fields.fields)?;
            }
        }

        write!(writer, " {}", event.metadata().level())?;
        if self.with_target {
            write!(writer, " {}:", event.metadata().target())?;
        }
        write!(writer, " ")?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
