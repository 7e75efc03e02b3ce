// Lead and contact listings

use std::collections::HashMap;

use sqlx::Row;

use super::DatabaseManager;
use crate::types::{ContactSummary, Lead, LeadId, LeadWithContacts, Operator, Source};
use crate::Result;

impl DatabaseManager {
    pub async fn get_lead_by_external_id(&self, external_id: &str) -> Result<Option<Lead>> {
        let lead = sqlx::query_as::<_, Lead>(
            "SELECT id, external_id, name, created_at FROM leads WHERE external_id = ?",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lead)
    }

    /// All leads ordered by id, each with its contacts ordered by id
    pub async fn list_leads_with_contacts(&self) -> Result<Vec<LeadWithContacts>> {
        let leads = sqlx::query_as::<_, Lead>(
            "SELECT id, external_id, name, created_at FROM leads ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let rows = sqlx::query(
            "SELECT c.id, c.lead_id, c.created_at, c.is_active, c.message,
                    s.id AS source_id, s.name AS source_name, s.code AS source_code,
                    o.id AS operator_id, o.name AS operator_name,
                    o.active AS operator_active, o.max_load AS operator_max_load
             FROM contacts c
             JOIN sources s ON s.id = c.source_id
             LEFT JOIN operators o ON o.id = c.operator_id
             ORDER BY c.id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut contacts_by_lead: HashMap<LeadId, Vec<ContactSummary>> = HashMap::new();
        for row in rows {
            let lead_id: LeadId = row.try_get("lead_id")?;
            let operator_id: Option<i64> = row.try_get("operator_id")?;
            let operator = match operator_id {
                Some(id) => Some(Operator {
                    id,
                    name: row.try_get("operator_name")?,
                    active: row.try_get("operator_active")?,
                    max_load: row.try_get("operator_max_load")?,
                }),
                None => None,
            };

            contacts_by_lead.entry(lead_id).or_default().push(ContactSummary {
                id: row.try_get("id")?,
                created_at: row.try_get("created_at")?,
                is_active: row.try_get("is_active")?,
                message: row.try_get("message")?,
                source: Source {
                    id: row.try_get("source_id")?,
                    name: row.try_get("source_name")?,
                    code: row.try_get("source_code")?,
                },
                operator,
            });
        }

        Ok(leads
            .into_iter()
            .map(|lead| LeadWithContacts {
                contacts: contacts_by_lead.remove(&lead.id).unwrap_or_default(),
                lead,
            })
            .collect())
    }
}
