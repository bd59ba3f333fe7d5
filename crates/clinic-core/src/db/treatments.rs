//! Treatment catalog database operations.

use rusqlite::params;

use super::{Database, DbResult};
use crate::models::Treatment;

impl Database {
    /// Insert a catalog entry.
    pub fn insert_treatment(&self, treatment: Treatment) -> DbResult<Treatment> {
        self.conn.execute(
            r#"
            INSERT INTO treatments (
                id, name, description, consent_template, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                treatment.id,
                treatment.name,
                treatment.description,
                treatment.consent_template,
                treatment.is_active,
                treatment.created_at,
            ],
        )?;
        Ok(treatment)
    }

    /// List active treatments by name.
    pub fn list_active_treatments(&self) -> DbResult<Vec<Treatment>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, description, consent_template, is_active, created_at
            FROM treatments
            WHERE is_active = 1
            ORDER BY name
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Treatment {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                consent_template: row.get(3)?,
                is_active: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
