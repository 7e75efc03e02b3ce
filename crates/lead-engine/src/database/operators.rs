// Operator administration

use tracing::info;
use validator::Validate;

use super::DatabaseManager;
use crate::types::{CreateOperatorRequest, Operator, OperatorId, UpdateOperatorRequest};
use crate::{LeadError, Result};

impl DatabaseManager {
    /// Register a new operator; names are unique
    pub async fn create_operator(&self, request: CreateOperatorRequest) -> Result<Operator> {
        request.validate()?;

        let result = sqlx::query("INSERT INTO operators (name, active, max_load) VALUES (?, ?, ?)")
            .bind(&request.name)
            .bind(request.active)
            .bind(request.max_load)
            .execute(&self.pool)
            .await
            .map_err(|e| duplicate_name(e, &request.name))?;

        let operator = Operator {
            id: result.last_insert_rowid(),
            name: request.name,
            active: request.active,
            max_load: request.max_load,
        };

        info!("Operator {} '{}' created (max_load {})", operator.id, operator.name, operator.max_load);
        Ok(operator)
    }

    pub async fn get_operator(&self, operator_id: OperatorId) -> Result<Option<Operator>> {
        let operator = sqlx::query_as::<_, Operator>(
            "SELECT id, name, active, max_load FROM operators WHERE id = ?",
        )
        .bind(operator_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(operator)
    }

    pub async fn list_operators(&self) -> Result<Vec<Operator>> {
        let operators = sqlx::query_as::<_, Operator>(
            "SELECT id, name, active, max_load FROM operators ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(operators)
    }

    /// Apply a partial update (rename, capacity change, activate/deactivate)
    pub async fn update_operator(
        &self,
        operator_id: OperatorId,
        updates: UpdateOperatorRequest,
    ) -> Result<Operator> {
        updates.validate()?;

        let mut operator = self
            .get_operator(operator_id)
            .await?
            .ok_or_else(|| LeadError::not_found(format!("operator {}", operator_id)))?;

        if let Some(name) = updates.name {
            operator.name = name;
        }
        if let Some(max_load) = updates.max_load {
            operator.max_load = max_load;
        }
        if let Some(active) = updates.active {
            operator.active = active;
        }

        sqlx::query("UPDATE operators SET name = ?, active = ?, max_load = ? WHERE id = ?")
            .bind(&operator.name)
            .bind(operator.active)
            .bind(operator.max_load)
            .bind(operator_id)
            .execute(&self.pool)
            .await
            .map_err(|e| duplicate_name(e, &operator.name))?;

        info!(
            "Operator {} updated: active={} max_load={}",
            operator.id, operator.active, operator.max_load
        );
        Ok(operator)
    }
}

fn duplicate_name(err: sqlx::Error, name: &str) -> LeadError {
    match LeadError::from(err) {
        LeadError::Conflict(_) => LeadError::conflict(format!("operator '{}' already exists", name)),
        other => other,
    }
}
