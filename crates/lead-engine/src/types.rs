//! Core types for lead-engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub type OperatorId = i64;
pub type SourceId = i64;
pub type LeadId = i64;
pub type ContactId = i64;

/// Default concurrent-contact cap for a new operator
pub const DEFAULT_MAX_LOAD: i64 = 10;

/// Largest weight accepted for one operator of a source
pub const MAX_WEIGHT: i64 = 1_000_000;

/// Human operator eligible to receive contacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Operator {
    pub id: OperatorId,
    pub name: String,
    pub active: bool,
    pub max_load: i64,
}

/// Inbound channel (bot, campaign) contacts arrive through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    pub code: Option<String>,
}

/// External party identified by a caller-supplied external id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lead {
    pub id: LeadId,
    pub external_id: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One inbound interaction, optionally assigned to an operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: ContactId,
    pub lead_id: LeadId,
    pub source_id: SourceId,
    pub operator_id: Option<OperatorId>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub message: Option<String>,
}

/// Weight configuration row of a source joined with its operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedOperator {
    pub operator: Operator,
    pub weight: i64,
}

/// Operator together with its current active-contact count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorLoad {
    pub operator: Operator,
    pub active_contacts: i64,
}

impl OperatorLoad {
    /// Active and strictly under its cap
    pub fn has_capacity(&self) -> bool {
        self.operator.active && self.active_contacts < self.operator.max_load
    }
}

/// Contact about to be inserted
#[derive(Debug, Clone)]
pub struct NewContact {
    pub lead_id: LeadId,
    pub source_id: SourceId,
    pub operator_id: Option<OperatorId>,
    pub message: Option<String>,
}

fn default_max_load() -> i64 {
    DEFAULT_MAX_LOAD
}

fn default_active() -> bool {
    true
}

/// Request to create an operator
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOperatorRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default = "default_max_load")]
    #[validate(range(min = 1))]
    pub max_load: i64,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl CreateOperatorRequest {
    pub fn new(name: impl Into<String>, max_load: i64) -> Self {
        Self {
            name: name.into(),
            max_load,
            active: true,
        }
    }
}

/// Partial update of an operator; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateOperatorRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(range(min = 1))]
    pub max_load: Option<i64>,
    pub active: Option<bool>,
}

/// Request to create a source
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSourceRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub code: Option<String>,
}

/// One entry of a source's weight configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct OperatorWeightInput {
    pub operator_id: OperatorId,
    #[validate(range(min = 0, max = MAX_WEIGHT))]
    pub weight: i64,
}

/// Configured operator weight as listed for a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorWeight {
    pub operator_id: OperatorId,
    pub operator_name: String,
    pub weight: i64,
}

/// Source with its full weight configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDetail {
    #[serde(flatten)]
    pub source: Source,
    pub operators: Vec<OperatorWeight>,
}

/// Inbound contact to register
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 255))]
    pub lead_external_id: String,
    #[validate(length(max = 255))]
    pub lead_name: Option<String>,
    pub source_id: SourceId,
    pub message: Option<String>,
}

/// Registered contact with its lead, source and (possibly absent) operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactView {
    pub id: ContactId,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub message: Option<String>,
    pub lead: Lead,
    pub source: Source,
    pub operator: Option<Operator>,
}

/// Contact as listed under its lead
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactSummary {
    pub id: ContactId,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub message: Option<String>,
    pub source: Source,
    pub operator: Option<Operator>,
}

/// Lead with all of its contacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadWithContacts {
    #[serde(flatten)]
    pub lead: Lead,
    pub contacts: Vec<ContactSummary>,
}

/// Assigned-contact count of one operator for one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceContactCount {
    pub source_id: SourceId,
    pub source_name: String,
    pub contacts_count: i64,
}

/// Per-operator distribution statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorStats {
    pub operator_id: OperatorId,
    pub operator_name: String,
    pub total_contacts: i64,
    pub sources: Vec<SourceContactCount>,
}
