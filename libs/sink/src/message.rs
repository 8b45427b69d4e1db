use chrono::{DateTime, Utc};

use user_api::{format_rfc3339_nanos, now_utc};

/// Неизменяемое сообщение sink'а: текст действия, id пользователя и
/// время постановки в очередь (не время рендера).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkMessage {
    text: String,
    producer_id: u64,
    enqueued_at: DateTime<Utc>,
}

impl SinkMessage {
    /// Создать сообщение с текущим временем.
    pub fn new(text: impl Into<String>, producer_id: u64) -> Self {
        Self::at(text, producer_id, now_utc())
    }

    pub fn at(text: impl Into<String>, producer_id: u64, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            producer_id,
            enqueued_at,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn producer_id(&self) -> u64 {
        self.producer_id
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    /// `<TAG> <text> user_id=<id> ts=<RFC3339 UTC, до наносекунд>`.
    ///
    /// Consumers parse this prefix, keep the layout stable.
    pub fn render(&self, tag: &str) -> String {
        format!(
            "{tag} {} user_id={} ts={}",
            self.text,
            self.producer_id,
            format_rfc3339_nanos(&self.enqueued_at)
        )
    }
}
