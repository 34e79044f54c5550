use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

use rhflow_core::audit::{AuditCategory, AuditEvent, AuditOutcome};
use rhflow_core::domain::request::{
    RequestFilter, RequestId, RequestKind, RequestRecord, SideEffect,
};

use super::{RepositoryError, RequestRepository, TransitionCommit};
use crate::DbPool;

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid timestamp `{raw}`: {error}")))
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<RequestRecord, RepositoryError> {
    let payload: String = row.try_get("payload_json").map_err(RepositoryError::decode)?;
    serde_json::from_str(&payload).map_err(RepositoryError::decode)
}

fn row_to_audit(row: &sqlx::sqlite::SqliteRow) -> Result<AuditEvent, RepositoryError> {
    let event_id: String = row.try_get("id").map_err(RepositoryError::decode)?;
    let request_id: Option<String> = row.try_get("request_id").map_err(RepositoryError::decode)?;
    let request_kind: Option<String> =
        row.try_get("request_kind").map_err(RepositoryError::decode)?;
    let correlation_id: String = row.try_get("correlation_id").map_err(RepositoryError::decode)?;
    let event_type: String = row.try_get("event_type").map_err(RepositoryError::decode)?;
    let category: String = row.try_get("category").map_err(RepositoryError::decode)?;
    let actor: String = row.try_get("actor").map_err(RepositoryError::decode)?;
    let outcome: String = row.try_get("outcome").map_err(RepositoryError::decode)?;
    let metadata_json: String = row.try_get("metadata_json").map_err(RepositoryError::decode)?;
    let occurred_at: String = row.try_get("occurred_at").map_err(RepositoryError::decode)?;

    let request_kind = match request_kind {
        Some(kind) => Some(
            RequestKind::parse(&kind)
                .ok_or_else(|| RepositoryError::Decode(format!("unknown request kind `{kind}`")))?,
        ),
        None => None,
    };
    let category = AuditCategory::parse(&category)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown audit category `{category}`")))?;
    let outcome = AuditOutcome::parse(&outcome)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown audit outcome `{outcome}`")))?;
    let metadata: BTreeMap<String, String> =
        serde_json::from_str(&metadata_json).map_err(RepositoryError::decode)?;

    Ok(AuditEvent {
        event_id,
        request_id: request_id.map(RequestId),
        request_kind,
        correlation_id,
        event_type,
        category,
        actor,
        outcome,
        metadata,
        occurred_at: parse_timestamp(&occurred_at)?,
    })
}

async fn insert_audit(
    conn: &mut SqliteConnection,
    event: &AuditEvent,
) -> Result<(), RepositoryError> {
    let metadata_json = serde_json::to_string(&event.metadata).map_err(RepositoryError::decode)?;

    sqlx::query(
        "INSERT INTO audit_event (id, request_id, request_kind, correlation_id, event_type,
                                  category, actor, outcome, metadata_json, occurred_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&event.event_id)
    .bind(event.request_id.as_ref().map(|id| id.0.as_str()))
    .bind(event.request_kind.map(RequestKind::as_str))
    .bind(&event.correlation_id)
    .bind(&event.event_type)
    .bind(event.category.as_str())
    .bind(&event.actor)
    .bind(event.outcome.as_str())
    .bind(metadata_json)
    .bind(event.occurred_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Rewrites the inbox/history index rows of a request.
async fn write_parties(
    conn: &mut SqliteConnection,
    record: &RequestRecord,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM approval_request_party WHERE request_id = ?")
        .bind(&record.id().0)
        .execute(&mut *conn)
        .await?;

    let pending = record.pending_approvers().into_iter().map(|id| (id, "pending"));
    let participants = record.participants().into_iter().map(|id| (id, "participant"));
    for (employee, role) in pending.chain(participants) {
        sqlx::query(
            "INSERT OR IGNORE INTO approval_request_party (request_id, employee_id, role)
             VALUES (?, ?, ?)",
        )
        .bind(&record.id().0)
        .bind(&employee.0)
        .bind(role)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

async fn apply_effect(
    conn: &mut SqliteConnection,
    effect: &SideEffect,
) -> Result<(), RepositoryError> {
    let result = match effect {
        SideEffect::DeactivateEmployee { employee } => {
            sqlx::query("UPDATE employee SET active = 0 WHERE id = ?")
                .bind(&employee.0)
                .execute(&mut *conn)
                .await?
        }
        SideEffect::ReassignEmployee { employee, cargo, sector } => {
            sqlx::query("UPDATE employee SET cargo_id = ?, primary_sector_id = ? WHERE id = ?")
                .bind(&cargo.0)
                .bind(&sector.0)
                .bind(&employee.0)
                .execute(&mut *conn)
                .await?
        }
    };

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound {
            entity: "employee",
            id: effect.employee().0.clone(),
        });
    }
    Ok(())
}

fn payload(record: &RequestRecord) -> Result<String, RepositoryError> {
    serde_json::to_string(record).map_err(RepositoryError::decode)
}

#[async_trait::async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn find_request(&self, id: &RequestId) -> Result<Option<RequestRecord>, RepositoryError> {
        let row = sqlx::query("SELECT payload_json FROM approval_request WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_record(r)?)),
            None => Ok(None),
        }
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<RequestRecord>, RepositoryError> {
        let mut query =
            QueryBuilder::<Sqlite>::new("SELECT r.payload_json FROM approval_request r WHERE 1 = 1");
        if let Some(kind) = filter.kind {
            query.push(" AND r.kind = ").push_bind(kind.as_str());
        }
        if let Some(requester) = &filter.requester {
            query.push(" AND r.requester_id = ").push_bind(requester.0.clone());
        }
        if let Some(terminal) = filter.terminal {
            query.push(" AND r.terminal = ").push_bind(i64::from(terminal));
        }
        for (employee, role) in [(&filter.pending_approver, "pending"), (&filter.participant, "participant")] {
            if let Some(employee) = employee {
                query
                    .push(
                        " AND EXISTS (SELECT 1 FROM approval_request_party p
                                      WHERE p.request_id = r.id AND p.role = ",
                    )
                    .push_bind(role)
                    .push(" AND p.employee_id = ")
                    .push_bind(employee.0.clone())
                    .push(")");
            }
        }
        query.push(" ORDER BY r.created_at ASC, r.id ASC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect::<Result<Vec<_>, _>>()
    }

    async fn insert_request(
        &self,
        record: RequestRecord,
        audit: Vec<AuditEvent>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO approval_request (id, kind, status, requester_id, terminal, version,
                                           payload_json, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id().0)
        .bind(record.kind().as_str())
        .bind(record.status_str())
        .bind(&record.requester().0)
        .bind(i64::from(record.is_terminal()))
        .bind(record.version())
        .bind(payload(&record)?)
        .bind(record.created_at().to_rfc3339())
        .bind(record.updated_at().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        write_parties(&mut tx, &record).await?;
        for event in &audit {
            insert_audit(&mut tx, event).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn commit_transition(&self, commit: TransitionCommit) -> Result<(), RepositoryError> {
        let TransitionCommit { record, expected_version, effects, audit } = commit;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE approval_request
             SET status = ?, terminal = ?, version = ?, payload_json = ?, updated_at = ?
             WHERE id = ? AND version = ?",
        )
        .bind(record.status_str())
        .bind(i64::from(record.is_terminal()))
        .bind(record.version())
        .bind(payload(&record)?)
        .bind(record.updated_at().to_rfc3339())
        .bind(&record.id().0)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(RepositoryError::Conflict { request: record.id().clone(), expected_version });
        }

        write_parties(&mut tx, &record).await?;
        for effect in &effects {
            apply_effect(&mut tx, effect).await?;
        }
        for event in &audit {
            insert_audit(&mut tx, event).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn append_audit(&self, event: AuditEvent) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_audit(&mut conn, &event).await
    }

    async fn list_audit_events(
        &self,
        request: &RequestId,
    ) -> Result<Vec<AuditEvent>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, request_id, request_kind, correlation_id, event_type, category, actor,
                    outcome, metadata_json, occurred_at
             FROM audit_event WHERE request_id = ? ORDER BY occurred_at ASC, rowid ASC",
        )
        .bind(&request.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_audit).collect::<Result<Vec<_>, _>>()
    }
}
