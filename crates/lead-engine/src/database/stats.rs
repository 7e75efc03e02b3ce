// Distribution statistics

use sqlx::Row;

use super::DatabaseManager;
use crate::types::{OperatorId, OperatorStats, SourceContactCount};
use crate::Result;

impl DatabaseManager {
    /// Assigned contacts per operator, broken down by source
    ///
    /// Counts every assigned contact regardless of `is_active`. Operators that
    /// never received a contact are omitted.
    pub async fn operator_stats(&self) -> Result<Vec<OperatorStats>> {
        let rows = sqlx::query(
            "SELECT o.id AS operator_id, o.name AS operator_name,
                    s.id AS source_id, s.name AS source_name,
                    COUNT(c.id) AS contacts_count
             FROM contacts c
             JOIN operators o ON o.id = c.operator_id
             JOIN sources s ON s.id = c.source_id
             GROUP BY o.id, s.id
             ORDER BY o.id, s.id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats: Vec<OperatorStats> = Vec::new();
        for row in rows {
            let operator_id: OperatorId = row.try_get("operator_id")?;
            let count = SourceContactCount {
                source_id: row.try_get("source_id")?,
                source_name: row.try_get("source_name")?,
                contacts_count: row.try_get("contacts_count")?,
            };

            // Rows arrive grouped by operator
            match stats.last_mut() {
                Some(item) if item.operator_id == operator_id => {
                    item.total_contacts += count.contacts_count;
                    item.sources.push(count);
                }
                _ => stats.push(OperatorStats {
                    operator_id,
                    operator_name: row.try_get("operator_name")?,
                    total_contacts: count.contacts_count,
                    sources: vec![count],
                }),
            }
        }

        Ok(stats)
    }
}
