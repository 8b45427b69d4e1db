//! Bounded асинхронный sink для audit и notification сообщений.
//!
//! Много producer'ов, ровно один consumer, который рендерит каждое
//! сообщение строкой через [`SinkWriter`]. `submit` никогда не блокирует
//! вызывающего и никогда не теряет сообщение молча. Счётчики sink'а
//! дублируются в `metrics` с label `sink` (`audit`, `notify`).

pub mod config;
mod message;
mod sink;
mod writer;

pub use config::{SinkConfig, WriterKind};
pub use message::SinkMessage;
pub use sink::{
    AsyncSink, SINK_OVERFLOWED_TOTAL, SINK_PENDING_OVERFLOW, SINK_RENDERED_TOTAL,
    SINK_SUBMITTED_TOTAL, SINK_WRITE_ERRORS_TOTAL, SinkStats,
};
pub use writer::{MemoryWriter, SinkWriter, StdoutWriter, TracingWriter};

/// Префикс строк audit sink'а.
pub const AUDIT_TAG: &str = "[AUDIT]";
/// Префикс строк notification sink'а.
pub const NOTIFY_TAG: &str = "[NOTIFY]";
