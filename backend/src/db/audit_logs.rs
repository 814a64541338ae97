use crate::core::{DbContext, DbError};

/// Stored audit row. Read back only by tests; the API exposes no audit listing.
#[cfg(test)]
#[derive(Debug, sqlx::FromRow)]
pub struct AuditLog {
    pub id: String,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Debug)]
pub struct NewAuditLog {
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub ip_address: Option<String>,
}

/// Audit rows are append-only.
pub async fn insert_audit_log(db: &DbContext, entry: NewAuditLog) -> Result<(), DbError> {
    sqlx::query(
        r"
        INSERT INTO audit_logs (id, tenant_id, user_id, action, entity_type, entity_id, ip_address)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(entry.tenant_id)
    .bind(entry.user_id)
    .bind(entry.action)
    .bind(entry.entity_type)
    .bind(entry.entity_id)
    .bind(entry.ip_address)
    .execute(db)
    .await?;
    Ok(())
}

#[cfg(test)]
pub async fn list_audit_logs_for_entity(db: &DbContext, entity_id: &str) -> Result<Vec<AuditLog>, DbError> {
    let logs = sqlx::query_as::<_, AuditLog>(
        r"
        SELECT id, tenant_id, user_id, action, entity_type, entity_id, ip_address, created_at
        FROM audit_logs
        WHERE entity_id = ?
        ORDER BY created_at, rowid
        ",
    )
    .bind(entity_id)
    .fetch_all(db)
    .await?;
    Ok(logs)
}
