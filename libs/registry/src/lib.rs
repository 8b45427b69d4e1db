pub mod error;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use user_api::UserRecord;

pub use error::RegistryError;

// ═══════════════════════════════════════════════════════════════
//  Registry
// ═══════════════════════════════════════════════════════════════

/// Потокобезопасное in-memory хранилище пользователей по id.
///
/// Мутации берут эксклюзивную блокировку на время изменения map,
/// чтения (`list`, `get`) берут разделяемую. Счётчик id живёт отдельно
/// от map: атомарный инкремент вне блокировки достаточен, т.к. id
/// требуется только монотонность, а зарезервированный id никто,
/// кроме создающего вызова, увидеть не может.
///
/// Вызывающий код валидирует name/email до `create`/`update`.
#[derive(Debug, Default)]
pub struct Registry {
    users: RwLock<HashMap<u64, UserRecord>>,
    next_id: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // Каждая мутация сводится к одному вызову HashMap, так что
    // poisoned lock не может содержать наполовину применённое изменение.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<u64, UserRecord>> {
        self.users.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<u64, UserRecord>> {
        self.users.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Снимок всех записей. Порядок не определён.
    pub fn list(&self) -> Vec<UserRecord> {
        self.read().values().cloned().collect()
    }

    pub fn get(&self, id: u64) -> Result<UserRecord, RegistryError> {
        self.read()
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))
    }

    /// Сохранить кандидата под новым id. id кандидата игнорируется.
    pub fn create(&self, candidate: UserRecord) -> UserRecord {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let user = candidate.with_id(id);
        self.write().insert(id, user.clone());
        tracing::debug!(user_id = id, "user created");
        user
    }

    /// Заменить запись целиком, сохранив id.
    pub fn update(&self, id: u64, candidate: UserRecord) -> Result<UserRecord, RegistryError> {
        let mut users = self.write();
        let slot = users.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        *slot = candidate.with_id(id);
        tracing::debug!(user_id = id, "user updated");
        Ok(slot.clone())
    }

    pub fn delete(&self, id: u64) -> Result<(), RegistryError> {
        if self.write().remove(&id).is_none() {
            return Err(RegistryError::NotFound(id));
        }
        tracing::debug!(user_id = id, "user deleted");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn ann() -> UserRecord {
        UserRecord::new("Ann", "ann@x.com")
    }

    fn bo() -> UserRecord {
        UserRecord::new("Bo", "bo@x.com")
    }

    #[test]
    fn create_assigns_sequential_ids_and_delete_removes() {
        let registry = Registry::new();

        let first = registry.create(ann());
        assert_eq!(first, UserRecord::new("Ann", "ann@x.com").with_id(1));

        let second = registry.create(bo());
        assert_eq!(second.id, 2);
        assert_eq!(second.name, "Bo");

        registry.delete(1).unwrap();
        assert_eq!(registry.get(1), Err(RegistryError::NotFound(1)));
        assert_eq!(registry.list(), vec![UserRecord::new("Bo", "bo@x.com").with_id(2)]);
    }

    #[test]
    fn create_ignores_candidate_id() {
        let registry = Registry::new();
        let created = registry.create(ann().with_id(42));
        assert_eq!(created.id, 1);
        assert_eq!(registry.get(42), Err(RegistryError::NotFound(42)));
    }

    #[test]
    fn get_returns_created_record_until_update() {
        let registry = Registry::new();
        let created = registry.create(ann());
        assert_eq!(registry.get(created.id).unwrap(), created);

        let updated = registry
            .update(created.id, UserRecord::new("Anna", "anna@x.com").with_id(99))
            .unwrap();
        assert_eq!(updated, UserRecord::new("Anna", "anna@x.com").with_id(created.id));
        assert_eq!(registry.get(created.id).unwrap(), updated);
    }

    #[test]
    fn update_missing_id_leaves_set_unchanged() {
        let registry = Registry::new();
        let created = registry.create(ann());

        assert_eq!(registry.update(7, bo()), Err(RegistryError::NotFound(7)));
        assert_eq!(registry.list(), vec![created]);
        assert_eq!(registry.get(7), Err(RegistryError::NotFound(7)));
    }

    #[test]
    fn second_delete_reports_not_found() {
        let registry = Registry::new();
        let created = registry.create(ann());

        assert_eq!(registry.delete(created.id), Ok(()));
        assert_eq!(registry.delete(created.id), Err(RegistryError::NotFound(created.id)));
        assert!(registry.is_empty());
    }

    #[test]
    fn ids_are_never_reused_after_delete() {
        let registry = Registry::new();
        let first = registry.create(ann());
        registry.delete(first.id).unwrap();
        let second = registry.create(ann());
        assert!(second.id > first.id);
    }

    #[test]
    fn concurrent_creates_yield_unique_positive_ids() {
        let registry = Arc::new(Registry::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = registry.clone();
                thread::spawn(move || {
                    (0..250)
                        .map(|i| {
                            registry
                                .create(UserRecord::new(format!("u{t}-{i}"), "u@x.com"))
                                .id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(id > 0);
                assert!(ids.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(ids.len(), 2000);
        assert_eq!(registry.len(), 2000);
    }

    #[test]
    fn list_size_tracks_creates_minus_deletes_under_contention() {
        let registry = Arc::new(Registry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || {
                    let mut created = 0usize;
                    let mut deleted = 0usize;
                    for i in 0..200 {
                        let user = registry.create(UserRecord::new("n", "n@x.com"));
                        created += 1;
                        if i % 3 == 0 && registry.delete(user.id).is_ok() {
                            deleted += 1;
                        }
                        // Читатели конкурируют с писателями.
                        let _ = registry.list();
                    }
                    (created, deleted)
                })
            })
            .collect();

        let (mut created, mut deleted) = (0, 0);
        for h in handles {
            let (c, d) = h.join().unwrap();
            created += c;
            deleted += d;
        }
        assert_eq!(registry.list().len(), created - deleted);
        assert_eq!(registry.len(), created - deleted);
    }
}
