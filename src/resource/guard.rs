use libsql::Connection;

use crate::error::ResourceError;
use crate::model::{Dependent, ResourceDescriptor};

pub async fn count_dependents(conn: &Connection, dependent: &Dependent, id: i64) -> Result<i64, ResourceError> {
    let query = format!(
        "SELECT COUNT(*) FROM {} WHERE {} = ?",
        dependent.table, dependent.foreign_key
    );
    let mut rows = conn.query(&query, libsql::params![id]).await?;
    match rows.next().await? {
        Some(row) => Ok(row.get::<i64>(0)?),
        None => Ok(0),
    }
}

/// True iff no dependent row references `id`.
pub async fn can_delete(conn: &Connection, descriptor: &ResourceDescriptor, id: i64) -> Result<bool, ResourceError> {
    for dependent in descriptor.dependents {
        let count = count_dependents(conn, dependent, id).await?;
        if count > 0 {
            tracing::debug!(
                resource = descriptor.name,
                id,
                dependents = dependent.table,
                count,
                "delete blocked by dependents"
            );
            return Ok(false);
        }
    }
    Ok(true)
}

/// Refuses with `Conflict` naming the relationship when a dependent exists.
/// Callers must run this in the same transaction as the delete.
pub async fn ensure_deletable(conn: &Connection, descriptor: &ResourceDescriptor, id: i64) -> Result<(), ResourceError> {
    if can_delete(conn, descriptor, id).await? {
        Ok(())
    } else {
        Err(conflict(descriptor))
    }
}

/// The error for a delete refused because rows still reference the record.
pub fn conflict(descriptor: &ResourceDescriptor) -> ResourceError {
    let message = match descriptor.dependents {
        [dependent] => dependent.message.to_string(),
        _ => format!("{} is still referenced", descriptor.name),
    };
    ResourceError::Conflict(message)
}
