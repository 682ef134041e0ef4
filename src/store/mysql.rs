use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySqlPool};
use uuid::Uuid;

use super::HrStore;
use crate::model::attendance::{AttendanceKey, AttendanceRecord, WorkLocation};
use crate::model::policy::WorkspacePolicy;

const ATTENDANCE_COLUMNS: &str = "id, workspace_id, user_id, work_date, check_in, check_out, \
     work_location, status, total_minutes";

#[derive(FromRow)]
struct AttendanceRow {
    id: String,
    workspace_id: String,
    user_id: String,
    work_date: NaiveDate,
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
    work_location: String,
    status: String,
    total_minutes: i64,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = anyhow::Error;

    fn try_from(row: AttendanceRow) -> anyhow::Result<Self> {
        Ok(AttendanceRecord {
            id: Uuid::parse_str(&row.id).with_context(|| format!("bad attendance id {}", row.id))?,
            workspace_id: row.workspace_id,
            user_id: row.user_id,
            date: row.work_date,
            check_in: row.check_in,
            check_out: row.check_out,
            work_location: row
                .work_location
                .parse()
                .with_context(|| format!("bad work_location {}", row.work_location))?,
            status: row
                .status
                .parse()
                .with_context(|| format!("bad status {}", row.status))?,
            total_minutes: row.total_minutes,
        })
    }
}

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn is_duplicate_key(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}

#[async_trait]
impl HrStore for MySqlStore {
    async fn find_attendance(&self, key: &AttendanceKey) -> anyhow::Result<Option<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records \
             WHERE workspace_id = ? AND user_id = ? AND work_date = ?"
        );
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(&key.workspace_id)
            .bind(&key.user_id)
            .bind(key.date)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("loading attendance {key}"))?;

        row.map(AttendanceRecord::try_from).transpose()
    }

    async fn list_attendance(
        &self,
        workspace_id: &str,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records \
             WHERE workspace_id = ? AND user_id = ? AND work_date BETWEEN ? AND ? \
             ORDER BY work_date"
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(workspace_id)
            .bind(user_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .context("listing attendance")?;

        rows.into_iter().map(AttendanceRecord::try_from).collect()
    }

    async fn list_open_remote(
        &self,
        workspace_id: &str,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records \
             WHERE workspace_id = ? AND work_date = ? AND work_location = ? \
             AND check_in IS NOT NULL AND check_out IS NULL"
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(workspace_id)
            .bind(date)
            .bind(WorkLocation::Remote.as_ref())
            .fetch_all(&self.pool)
            .await
            .context("listing open remote attendance")?;

        rows.into_iter().map(AttendanceRecord::try_from).collect()
    }

    async fn upsert_check_in(&self, record: &AttendanceRecord) -> anyhow::Result<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO attendance_records
                (id, workspace_id, user_id, work_date, check_in, check_out,
                 work_location, status, total_minutes)
            VALUES (?, ?, ?, ?, ?, NULL, ?, ?, 0)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.workspace_id)
        .bind(&record.user_id)
        .bind(record.date)
        .bind(record.check_in)
        .bind(record.work_location.as_ref())
        .bind(record.status.as_ref())
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => return Ok(true),
            Err(e) if is_duplicate_key(&e) => {}
            Err(e) => return Err(e).context("inserting check-in"),
        }

        // A row exists for the day; claim it only if nobody checked in yet.
        let updated = sqlx::query(
            r#"
            UPDATE attendance_records
            SET check_in = ?, check_out = NULL, work_location = ?, status = ?, total_minutes = 0
            WHERE workspace_id = ? AND user_id = ? AND work_date = ? AND check_in IS NULL
            "#,
        )
        .bind(record.check_in)
        .bind(record.work_location.as_ref())
        .bind(record.status.as_ref())
        .bind(&record.workspace_id)
        .bind(&record.user_id)
        .bind(record.date)
        .execute(&self.pool)
        .await
        .context("claiming attendance placeholder")?;

        Ok(updated.rows_affected() == 1)
    }

    async fn complete_check_out(&self, record: &AttendanceRecord) -> anyhow::Result<bool> {
        let updated = sqlx::query(
            r#"
            UPDATE attendance_records
            SET check_out = ?, total_minutes = ?
            WHERE id = ? AND check_in IS NOT NULL AND check_out IS NULL
            "#,
        )
        .bind(record.check_out)
        .bind(record.total_minutes)
        .bind(record.id.to_string())
        .execute(&self.pool)
        .await
        .context("completing check-out")?;

        Ok(updated.rows_affected() == 1)
    }

    async fn load_policy(&self, workspace_id: &str) -> anyhow::Result<Option<WorkspacePolicy>> {
        let row = sqlx::query_as::<_, (String,)>(
            "SELECT document FROM workspace_policies WHERE workspace_id = ?",
        )
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await
        .context("loading workspace policy")?;

        row.map(|(document,)| {
            serde_json::from_str(&document)
                .with_context(|| format!("decoding policy for workspace {workspace_id}"))
        })
        .transpose()
    }

    async fn save_policy(&self, workspace_id: &str, policy: &WorkspacePolicy) -> anyhow::Result<()> {
        let document = serde_json::to_string(policy)?;
        sqlx::query(
            r#"
            INSERT INTO workspace_policies (workspace_id, policy_version, policy_status, document, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                policy_version = VALUES(policy_version),
                policy_status = VALUES(policy_status),
                document = VALUES(document),
                updated_at = VALUES(updated_at)
            "#,
        )
        .bind(workspace_id)
        .bind(&policy.policy_version)
        .bind(policy.policy_status.as_ref())
        .bind(document)
        .bind(policy.updated_at.unwrap_or_else(Utc::now))
        .execute(&self.pool)
        .await
        .context("saving workspace policy")?;

        Ok(())
    }
}
