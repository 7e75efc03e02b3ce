//! In-memory [`RoutingStore`] for unit tests
//!
//! Besides plain storage it can simulate other writers acting between reads:
//! contacts committed between the load snapshot and the recheck, operators
//! deactivated in that window, and a lead inserted by a concurrent resolver.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;

use super::RoutingStore;
use crate::types::{
    Contact, Lead, LeadId, NewContact, Operator, OperatorId, OperatorLoad, SourceId, WeightedOperator,
};
use crate::{LeadError, Result};

#[derive(Default)]
pub(crate) struct MemoryStore {
    pub leads: Vec<Lead>,
    pub operators: BTreeMap<OperatorId, Operator>,
    /// (source, operator, weight) in configuration order
    pub weights: Vec<(SourceId, OperatorId, i64)>,
    pub contacts: Vec<Contact>,
    /// Extra active contacts visible only to the recheck
    pub racing_load: HashMap<OperatorId, i64>,
    /// Operators that read as inactive on recheck
    pub racing_deactivation: HashSet<OperatorId>,
    /// Operators rechecked, in order
    pub rechecks: Vec<OperatorId>,
    racing_lead: Option<(String, Option<String>)>,
}

impl MemoryStore {
    pub fn add_operator(&mut self, id: OperatorId, max_load: i64) -> &mut Self {
        self.operators.insert(
            id,
            Operator {
                id,
                name: format!("op-{}", id),
                active: true,
                max_load,
            },
        );
        self
    }

    pub fn configure(&mut self, source_id: SourceId, operator_id: OperatorId, weight: i64) -> &mut Self {
        self.weights.push((source_id, operator_id, weight));
        self
    }

    /// Give `operator_id` `count` active contacts
    pub fn load(&mut self, operator_id: OperatorId, count: i64) -> &mut Self {
        for _ in 0..count {
            let id = self.contacts.len() as i64 + 1;
            self.contacts.push(Contact {
                id,
                lead_id: 0,
                source_id: 0,
                operator_id: Some(operator_id),
                created_at: Utc::now(),
                is_active: true,
                message: None,
            });
        }
        self
    }

    /// Make the next insert of `external_id` lose a race against another writer
    pub fn race_lead_insert(&mut self, external_id: &str, name: Option<&str>) {
        self.racing_lead = Some((external_id.to_string(), name.map(str::to_string)));
    }

    fn active_count(&self, operator_id: OperatorId) -> i64 {
        self.contacts
            .iter()
            .filter(|c| c.is_active && c.operator_id == Some(operator_id))
            .count() as i64
    }

    fn push_lead(&mut self, external_id: String, name: Option<String>) -> Lead {
        let lead = Lead {
            id: self.leads.len() as LeadId + 1,
            external_id,
            name,
            created_at: Utc::now(),
        };
        self.leads.push(lead.clone());
        lead
    }
}

#[async_trait]
impl RoutingStore for MemoryStore {
    async fn find_lead_by_external_id(&mut self, external_id: &str) -> Result<Option<Lead>> {
        Ok(self.leads.iter().find(|l| l.external_id == external_id).cloned())
    }

    async fn insert_lead(&mut self, external_id: &str, name: Option<&str>) -> Result<Lead> {
        if let Some((racing_id, racing_name)) = self.racing_lead.take() {
            if racing_id == external_id {
                self.push_lead(racing_id, racing_name);
                return Err(LeadError::conflict(format!("lead '{}' already exists", external_id)));
            }
            self.racing_lead = Some((racing_id, racing_name));
        }
        if self.leads.iter().any(|l| l.external_id == external_id) {
            return Err(LeadError::conflict(format!("lead '{}' already exists", external_id)));
        }
        Ok(self.push_lead(external_id.to_string(), name.map(str::to_string)))
    }

    async fn update_lead_name(&mut self, lead_id: LeadId, name: &str) -> Result<bool> {
        let lead = self
            .leads
            .iter_mut()
            .find(|l| l.id == lead_id && l.name.as_deref().is_none_or(str::is_empty));
        match lead {
            Some(lead) => {
                lead.name = Some(name.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_active_weight_configs(&mut self, source_id: SourceId) -> Result<Vec<WeightedOperator>> {
        let mut configs: Vec<WeightedOperator> = self
            .weights
            .iter()
            .filter(|(source, _, _)| *source == source_id)
            .filter_map(|(_, operator_id, weight)| {
                self.operators
                    .get(operator_id)
                    .filter(|op| op.active)
                    .map(|op| WeightedOperator {
                        operator: op.clone(),
                        weight: *weight,
                    })
            })
            .collect();
        configs.sort_by_key(|c| c.operator.id);
        Ok(configs)
    }

    async fn count_active_contacts(&mut self, operator_ids: &[OperatorId]) -> Result<HashMap<OperatorId, i64>> {
        Ok(operator_ids
            .iter()
            .map(|id| (*id, self.active_count(*id)))
            .filter(|(_, count)| *count > 0)
            .collect())
    }

    async fn operator_load(&mut self, operator_id: OperatorId) -> Result<Option<OperatorLoad>> {
        self.rechecks.push(operator_id);
        let Some(mut operator) = self.operators.get(&operator_id).cloned() else {
            return Ok(None);
        };
        if self.racing_deactivation.contains(&operator_id) {
            operator.active = false;
        }
        let active_contacts =
            self.active_count(operator_id) + self.racing_load.get(&operator_id).copied().unwrap_or(0);
        Ok(Some(OperatorLoad {
            operator,
            active_contacts,
        }))
    }

    async fn insert_contact(&mut self, contact: NewContact) -> Result<Contact> {
        let contact = Contact {
            id: self.contacts.len() as i64 + 1,
            lead_id: contact.lead_id,
            source_id: contact.source_id,
            operator_id: contact.operator_id,
            created_at: Utc::now(),
            is_active: true,
            message: contact.message,
        };
        self.contacts.push(contact.clone());
        Ok(contact)
    }
}
