use async_trait::async_trait;
use chrono::NaiveDate;

use crate::model::attendance::{AttendanceKey, AttendanceRecord};
use crate::model::policy::WorkspacePolicy;

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// Persistence seam for attendance records and workspace policies.
///
/// The two attendance writes are conditional: `upsert_check_in` only lands
/// while the day's record has no check-in, `complete_check_out` only while
/// it has no check-out. Both report whether the write happened so the
/// loser of a concurrent race can be told apart from the winner.
#[async_trait]
pub trait HrStore: Send + Sync {
    async fn find_attendance(&self, key: &AttendanceKey) -> anyhow::Result<Option<AttendanceRecord>>;

    async fn list_attendance(
        &self,
        workspace_id: &str,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<AttendanceRecord>>;

    /// Today's REMOTE records in a workspace that are checked in but not out.
    async fn list_open_remote(
        &self,
        workspace_id: &str,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<AttendanceRecord>>;

    async fn upsert_check_in(&self, record: &AttendanceRecord) -> anyhow::Result<bool>;

    async fn complete_check_out(&self, record: &AttendanceRecord) -> anyhow::Result<bool>;

    async fn load_policy(&self, workspace_id: &str) -> anyhow::Result<Option<WorkspacePolicy>>;

    async fn save_policy(&self, workspace_id: &str, policy: &WorkspacePolicy) -> anyhow::Result<()>;
}
