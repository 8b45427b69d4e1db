use std::sync::Arc;

use serde::Deserialize;

pub use user_api::OverflowPolicy;

use crate::writer::{SinkWriter, StdoutWriter, TracingWriter};

// ═══════════════════════════════════════════════════════════════
//  Sink Config
// ═══════════════════════════════════════════════════════════════

/// Конфигурация одного sink'а (audit или notify).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SinkConfig {
    /// Ёмкость bounded очереди (C).
    #[serde(default = "default_sink_buffer")]
    pub buffer: usize,
    /// Что делать с сообщением, когда очередь полна.
    #[serde(default)]
    pub overflow: OverflowPolicy,
    /// Куда рендерить строки.
    #[serde(default)]
    pub writer: WriterKind,
}

fn default_sink_buffer() -> usize {
    10_000
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            buffer: default_sink_buffer(),
            overflow: OverflowPolicy::default(),
            writer: WriterKind::default(),
        }
    }
}

/// Встроенные writer'ы, доступные из конфига.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriterKind {
    #[default]
    Tracing,
    Stdout,
}

impl WriterKind {
    pub fn build(self) -> Arc<dyn SinkWriter> {
        match self {
            WriterKind::Tracing => Arc::new(TracingWriter),
            WriterKind::Stdout => Arc::new(StdoutWriter),
        }
    }
}
