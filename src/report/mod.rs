mod assembler;
mod format;
mod item;
mod kind;
mod layout;
mod metrics;
mod stats;

pub use assembler::{ReportGenerator, END_MARKER};
pub use format::{
    format_currency, format_date, format_date_time, format_local_date_time, format_number,
    parse_timestamp, truncate_text,
};
pub use item::{lenient_number, ExpenseItem, GameSessionItem, ReportItem};
pub use kind::{
    DateStyle, Field, Grouping, PartialReportConfig, ReportConfig, ReportKind, ReportLayout,
    Summary, DEFAULT_DATE_RANGE, DEFAULT_STORE_NAME, DEFAULT_STORE_PHONE,
};
pub use layout::{Align, Canvas, Document, DrawOp, Page};
pub use metrics::text_width;
pub use stats::{Breakdown, GroupStats, Statistics, UNKNOWN_GROUP};
