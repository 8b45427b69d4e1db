use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════
//  Overflow Policy
// ════════════════════════════════════════════════════════════════

/// Стратегия поведения при переполнении bounded очереди sink'а.
///
/// Ни одна из стратегий не теряет сообщения: обе гарантируют
/// eventual delivery без блокировки отправителя.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Отдельная detached задача на каждое сообщение, ждёт `.send().await`
    /// пока в очереди не появится место.
    #[default]
    #[serde(alias = "backpressure")]
    BackPressure,
    /// Unbounded вторичная очередь, которую дренирует тот же consumer.
    Spill,
}

impl std::fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverflowPolicy::BackPressure => f.write_str("back_pressure"),
            OverflowPolicy::Spill => f.write_str("spill"),
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  UserRecord
// ════════════════════════════════════════════════════════════════

/// Запись пользователя в registry.
///
/// `id` назначается registry при создании и дальше не меняется.
/// В теле запроса любое поле можно опустить: отсутствующий id равен 0
/// (registry его никогда не выдаёт), пустые name/email отсекает валидация.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub id: u64,
    pub name: String,
    pub email: String,
}

// Клиентский id всегда перезаписывается registry, поэтому любое
// целое в теле допустимо; отрицательное читается как 0.
fn lenient_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Unsigned(id) => id,
        RawId::Signed(_) => 0,
    })
}

impl UserRecord {
    /// Кандидат без id, для Create/Update.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            email: email.into(),
        }
    }

    /// Та же запись с указанным id.
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_record_id_defaults_to_zero() {
        let user: UserRecord =
            serde_json::from_str(r#"{"name":"Ann","email":"ann@x.com"}"#).unwrap();
        assert_eq!(user, UserRecord::new("Ann", "ann@x.com"));
        assert_eq!(user.id, 0);

        let empty: UserRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, UserRecord::default());
    }

    #[test]
    fn user_record_accepts_any_integer_id() {
        let negative: UserRecord =
            serde_json::from_str(r#"{"id":-1,"name":"Ann","email":"ann@x.com"}"#).unwrap();
        assert_eq!(negative, UserRecord::new("Ann", "ann@x.com"));

        let positive: UserRecord = serde_json::from_str(r#"{"id":5}"#).unwrap();
        assert_eq!(positive.id, 5);

        assert!(serde_json::from_str::<UserRecord>(r#"{"id":"5"}"#).is_err());
        assert!(serde_json::from_str::<UserRecord>(r#"{"id":1.5}"#).is_err());
    }

    #[test]
    fn user_record_serializes_all_fields() {
        let user = UserRecord::new("Bo", "bo@x.com").with_id(2);
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json, serde_json::json!({"id": 2, "name": "Bo", "email": "bo@x.com"}));
    }

    #[test]
    fn overflow_policy_accepts_snake_case_and_alias() {
        #[derive(Deserialize)]
        struct Wrap {
            overflow: OverflowPolicy,
        }
        let a: Wrap = serde_json::from_str(r#"{"overflow":"back_pressure"}"#).unwrap();
        let b: Wrap = serde_json::from_str(r#"{"overflow":"backpressure"}"#).unwrap();
        let c: Wrap = serde_json::from_str(r#"{"overflow":"spill"}"#).unwrap();
        assert_eq!(a.overflow, OverflowPolicy::BackPressure);
        assert_eq!(b.overflow, OverflowPolicy::BackPressure);
        assert_eq!(c.overflow, OverflowPolicy::Spill);
        assert_eq!(OverflowPolicy::default().to_string(), "back_pressure");
    }
}
