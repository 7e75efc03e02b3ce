//! Storage operations consumed by the lead resolver and the assignment engine
//!
//! Every method runs inside whatever transaction the implementor represents;
//! the resolver and the engine never begin or commit one themselves. The
//! production implementation is [`sqlx::SqliteConnection`], so callers pass
//! `&mut *tx` straight from a [`sqlx::Transaction`].

use std::collections::HashMap;

use async_trait::async_trait;

use crate::types::{
    Contact, Lead, LeadId, NewContact, OperatorId, OperatorLoad, SourceId, WeightedOperator,
};
use crate::Result;

#[async_trait]
pub trait RoutingStore: Send {
    async fn find_lead_by_external_id(&mut self, external_id: &str) -> Result<Option<Lead>>;

    /// Insert a lead. A duplicate external id fails with `LeadError::Conflict`.
    async fn insert_lead(&mut self, external_id: &str, name: Option<&str>) -> Result<Lead>;

    /// Set the lead's name only if it is still unset or empty. Returns whether a row changed.
    async fn update_lead_name(&mut self, lead_id: LeadId, name: &str) -> Result<bool>;

    /// Weight configurations of `source_id` whose operator is active, ordered by operator id
    async fn list_active_weight_configs(&mut self, source_id: SourceId) -> Result<Vec<WeightedOperator>>;

    /// Active-contact counts for the given operators; operators without any are absent
    async fn count_active_contacts(&mut self, operator_ids: &[OperatorId]) -> Result<HashMap<OperatorId, i64>>;

    /// Fresh state and active-contact count of a single operator
    async fn operator_load(&mut self, operator_id: OperatorId) -> Result<Option<OperatorLoad>>;

    async fn insert_contact(&mut self, contact: NewContact) -> Result<Contact>;
}

#[cfg(test)]
pub(crate) mod memory;
