//! In-memory reset backend used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use uuid::Uuid;

use super::{ADMIN_ROLE, PROFILES_TABLE, RESET_TABLES, ResetBackend, ResetError, ResetReport, TableReset};

/// In-memory tables: name -> rows of (id, role).
#[derive(Default)]
pub struct FakeResetBackend {
    pub roles: Mutex<HashMap<Uuid, String>>,
    pub tables: Mutex<HashMap<&'static str, Vec<(Uuid, Option<String>)>>>,
    pub fail: AtomicBool,
}

impl FakeResetBackend {
    pub fn with_profile(self, id: Uuid, role: &str) -> Self {
        self.roles.lock().unwrap().insert(id, role.to_owned());
        self.tables
            .lock()
            .unwrap()
            .entry(PROFILES_TABLE)
            .or_default()
            .push((id, Some(role.to_owned())));
        self
    }

    pub fn with_rows(self, table: &'static str, count: usize) -> Self {
        let rows = (0..count).map(|_| (Uuid::new_v4(), None));
        self.tables.lock().unwrap().entry(table).or_default().extend(rows);
        self
    }

    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.lock().unwrap().get(table).map_or(0, Vec::len)
    }
}

#[async_trait::async_trait]
impl ResetBackend for FakeResetBackend {
    async fn stored_role(&self, user_id: Uuid) -> Result<Option<String>, ResetError> {
        Ok(self.roles.lock().unwrap().get(&user_id).cloned())
    }

    async fn reset(&self, caller: Uuid) -> Result<ResetReport, ResetError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ResetError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut tables = self.tables.lock().unwrap();
        let mut report = ResetReport::default();
        for table in RESET_TABLES {
            let Some(rows) = tables.get_mut(table) else { continue };
            let before = rows.len();
            if table == PROFILES_TABLE {
                rows.retain(|(id, role)| *id == caller || role.as_deref() == Some(ADMIN_ROLE));
            } else {
                rows.clear();
            }
            report.tables.push(TableReset { table, deleted: (before - rows.len()) as u64 });
        }
        Ok(report)
    }
}
