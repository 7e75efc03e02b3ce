//! [`RoutingStore`] on a live SQLite connection or transaction

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use tracing::debug;

use crate::store::RoutingStore;
use crate::types::{
    Contact, Lead, LeadId, NewContact, Operator, OperatorId, OperatorLoad, SourceId, WeightedOperator,
};
use crate::{LeadError, Result};

#[async_trait]
impl RoutingStore for SqliteConnection {
    async fn find_lead_by_external_id(&mut self, external_id: &str) -> Result<Option<Lead>> {
        let lead = sqlx::query_as::<_, Lead>(
            "SELECT id, external_id, name, created_at FROM leads WHERE external_id = ?",
        )
        .bind(external_id)
        .fetch_optional(&mut *self)
        .await?;

        Ok(lead)
    }

    async fn insert_lead(&mut self, external_id: &str, name: Option<&str>) -> Result<Lead> {
        let created_at = Utc::now();

        let result = sqlx::query("INSERT INTO leads (external_id, name, created_at) VALUES (?, ?, ?)")
            .bind(external_id)
            .bind(name)
            .bind(created_at)
            .execute(&mut *self)
            .await
            .map_err(|e| match LeadError::from(e) {
                LeadError::Conflict(_) => {
                    LeadError::conflict(format!("lead '{}' already exists", external_id))
                }
                other => other,
            })?;

        Ok(Lead {
            id: result.last_insert_rowid(),
            external_id: external_id.to_string(),
            name: name.map(str::to_string),
            created_at,
        })
    }

    async fn update_lead_name(&mut self, lead_id: LeadId, name: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE leads SET name = ? WHERE id = ? AND (name IS NULL OR name = '')")
            .bind(name)
            .bind(lead_id)
            .execute(&mut *self)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_active_weight_configs(&mut self, source_id: SourceId) -> Result<Vec<WeightedOperator>> {
        let rows = sqlx::query(
            "SELECT o.id, o.name, o.active, o.max_load, c.weight
             FROM source_operator_configs c
             JOIN operators o ON o.id = c.operator_id
             WHERE c.source_id = ? AND o.active = 1
             ORDER BY o.id ASC",
        )
        .bind(source_id)
        .fetch_all(&mut *self)
        .await?;

        let mut configs = Vec::with_capacity(rows.len());
        for row in rows {
            configs.push(WeightedOperator {
                operator: operator_from_row(&row)?,
                weight: row.try_get("weight")?,
            });
        }

        debug!("Source {} has {} active weight configs", source_id, configs.len());
        Ok(configs)
    }

    async fn count_active_contacts(&mut self, operator_ids: &[OperatorId]) -> Result<HashMap<OperatorId, i64>> {
        if operator_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT operator_id, COUNT(id) AS active_contacts FROM contacts WHERE is_active = 1 AND operator_id IN (",
        );
        let mut ids = query.separated(", ");
        for operator_id in operator_ids {
            ids.push_bind(*operator_id);
        }
        ids.push_unseparated(") GROUP BY operator_id");

        let rows = query.build().fetch_all(&mut *self).await?;

        let mut loads = HashMap::with_capacity(rows.len());
        for row in rows {
            loads.insert(row.try_get("operator_id")?, row.try_get("active_contacts")?);
        }
        Ok(loads)
    }

    async fn operator_load(&mut self, operator_id: OperatorId) -> Result<Option<OperatorLoad>> {
        let row = sqlx::query(
            "SELECT o.id, o.name, o.active, o.max_load,
                    (SELECT COUNT(c.id) FROM contacts c
                      WHERE c.operator_id = o.id AND c.is_active = 1) AS active_contacts
             FROM operators o
             WHERE o.id = ?",
        )
        .bind(operator_id)
        .fetch_optional(&mut *self)
        .await?;

        match row {
            Some(row) => Ok(Some(OperatorLoad {
                operator: operator_from_row(&row)?,
                active_contacts: row.try_get("active_contacts")?,
            })),
            None => Ok(None),
        }
    }

    async fn insert_contact(&mut self, contact: NewContact) -> Result<Contact> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO contacts (lead_id, source_id, operator_id, created_at, is_active, message)
             VALUES (?, ?, ?, ?, 1, ?)",
        )
        .bind(contact.lead_id)
        .bind(contact.source_id)
        .bind(contact.operator_id)
        .bind(created_at)
        .bind(&contact.message)
        .execute(&mut *self)
        .await?;

        Ok(Contact {
            id: result.last_insert_rowid(),
            lead_id: contact.lead_id,
            source_id: contact.source_id,
            operator_id: contact.operator_id,
            created_at,
            is_active: true,
            message: contact.message,
        })
    }
}

/// Operator columns selected as `id, name, active, max_load`
pub(crate) fn operator_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Operator> {
    Ok(Operator {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        active: row.try_get("active")?,
        max_load: row.try_get("max_load")?,
    })
}
