// Source administration and per-source operator weight sets

use std::collections::{BTreeSet, HashSet};

use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use tracing::{info, warn};
use validator::Validate;

use super::DatabaseManager;
use crate::types::{
    CreateSourceRequest, MAX_WEIGHT, OperatorId, OperatorWeight, OperatorWeightInput, Source, SourceDetail,
    SourceId,
};
use crate::{LeadError, Result};

impl DatabaseManager {
    /// Register a new source; both name and code are unique
    pub async fn create_source(&self, request: CreateSourceRequest) -> Result<Source> {
        request.validate()?;

        let result = sqlx::query("INSERT INTO sources (name, code) VALUES (?, ?)")
            .bind(&request.name)
            .bind(&request.code)
            .execute(&self.pool)
            .await
            .map_err(|e| match LeadError::from(e) {
                LeadError::Conflict(_) => LeadError::conflict(format!(
                    "source with name '{}' or code '{}' already exists",
                    request.name,
                    request.code.as_deref().unwrap_or("")
                )),
                other => other,
            })?;

        let source = Source {
            id: result.last_insert_rowid(),
            name: request.name,
            code: request.code,
        };

        info!("Source {} '{}' created", source.id, source.name);
        Ok(source)
    }

    pub async fn get_source(&self, source_id: SourceId) -> Result<Option<Source>> {
        let source = sqlx::query_as::<_, Source>("SELECT id, name, code FROM sources WHERE id = ?")
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(source)
    }

    pub async fn list_sources(&self) -> Result<Vec<Source>> {
        let sources = sqlx::query_as::<_, Source>("SELECT id, name, code FROM sources ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(sources)
    }

    /// Source with its configured operators, including inactive ones
    pub async fn get_source_detail(&self, source_id: SourceId) -> Result<SourceDetail> {
        let source = self
            .get_source(source_id)
            .await?
            .ok_or_else(|| LeadError::not_found(format!("source {}", source_id)))?;

        let operators = self.list_source_weights(source_id).await?;
        Ok(SourceDetail { source, operators })
    }

    /// Replace the whole weight configuration of a source
    ///
    /// Each weight must lie in `0..=MAX_WEIGHT`. The previous set is deleted
    /// and the new one inserted in one transaction; operators missing from
    /// `weights` are no longer eligible for this source. An empty set clears
    /// the configuration.
    pub async fn replace_source_weights(
        &self,
        source_id: SourceId,
        weights: Vec<OperatorWeightInput>,
    ) -> Result<SourceDetail> {
        let mut seen = HashSet::with_capacity(weights.len());
        for item in &weights {
            item.validate().map_err(|e| {
                LeadError::validation(format!(
                    "weight for operator {} must be between 0 and {}: {}",
                    item.operator_id, MAX_WEIGHT, e
                ))
            })?;
            if !seen.insert(item.operator_id) {
                return Err(LeadError::validation(format!(
                    "operator {} listed more than once",
                    item.operator_id
                )));
            }
        }

        let mut tx = self.begin_write().await?;
        match write_source_weights(&mut tx, source_id, &weights).await {
            Ok(()) => tx.commit().await?,
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback of weight replacement for source {} failed: {}", source_id, rollback);
                }
                return Err(e);
            }
        }
        info!("Source {} weight set replaced with {} operators", source_id, weights.len());

        self.get_source_detail(source_id).await
    }

    async fn list_source_weights(&self, source_id: SourceId) -> Result<Vec<OperatorWeight>> {
        let rows = sqlx::query(
            "SELECT c.operator_id, o.name AS operator_name, c.weight
             FROM source_operator_configs c
             JOIN operators o ON o.id = c.operator_id
             WHERE c.source_id = ?
             ORDER BY c.id",
        )
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        let mut weights = Vec::with_capacity(rows.len());
        for row in rows {
            weights.push(OperatorWeight {
                operator_id: row.try_get("operator_id")?,
                operator_name: row.try_get("operator_name")?,
                weight: row.try_get("weight")?,
            });
        }
        Ok(weights)
    }
}

async fn write_source_weights(
    conn: &mut SqliteConnection,
    source_id: SourceId,
    weights: &[OperatorWeightInput],
) -> Result<()> {
    let exists = sqlx::query("SELECT id FROM sources WHERE id = ?")
        .bind(source_id)
        .fetch_optional(&mut *conn)
        .await?
        .is_some();
    if !exists {
        return Err(LeadError::not_found(format!("source {}", source_id)));
    }

    if !weights.is_empty() {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT id FROM operators WHERE id IN (");
        let mut ids = query.separated(", ");
        for item in weights {
            ids.push_bind(item.operator_id);
        }
        ids.push_unseparated(")");

        let found: HashSet<OperatorId> = query
            .build()
            .fetch_all(&mut *conn)
            .await?
            .iter()
            .map(|row| row.try_get("id"))
            .collect::<std::result::Result<_, _>>()?;

        let missing: BTreeSet<OperatorId> = weights
            .iter()
            .map(|item| item.operator_id)
            .filter(|id| !found.contains(id))
            .collect();
        if !missing.is_empty() {
            return Err(LeadError::validation(format!(
                "operators not found: {:?}",
                missing.into_iter().collect::<Vec<_>>()
            )));
        }
    }

    sqlx::query("DELETE FROM source_operator_configs WHERE source_id = ?")
        .bind(source_id)
        .execute(&mut *conn)
        .await?;

    for item in weights {
        sqlx::query("INSERT INTO source_operator_configs (source_id, operator_id, weight) VALUES (?, ?, ?)")
            .bind(source_id)
            .bind(item.operator_id)
            .bind(item.weight)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}
