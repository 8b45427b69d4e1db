//! Общие типы user-service: запись пользователя, политика переполнения
//! очередей и форматирование временных меток.

mod types;
mod util;

pub use types::{OverflowPolicy, UserRecord};
pub use util::{format_rfc3339_nanos, now_utc};
