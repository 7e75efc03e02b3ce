//! # Contact ingestion
//!
//! [`LeadRouter`] ties the pieces together for one inbound contact: inside a
//! single transaction it resolves (or creates) the lead, asks the
//! [`AssignmentEngine`] for an operator and stores the contact, assigned or
//! not. A crash anywhere before the commit leaves neither a new lead nor a
//! contact behind.
//!
//! The transaction is a [`WriteTransaction`](crate::database::WriteTransaction):
//! concurrent registrations queue on SQLite's write lock instead of failing
//! with `SQLITE_BUSY`, and each one sees the contacts committed before it.
//!
//! ```rust
//! use lead_engine::{LeadRouter, DatabaseManager};
//! use lead_engine::types::{ContactRequest, CreateSourceRequest};
//!
//! # async fn example() -> lead_engine::Result<()> {
//! let router = LeadRouter::new(DatabaseManager::new_in_memory().await?);
//! let source = router.database().create_source(CreateSourceRequest {
//!     name: "telegram-bot".to_string(),
//!     code: Some("tg".to_string()),
//! }).await?;
//!
//! let contact = router.register_contact(ContactRequest {
//!     lead_external_id: "tg:100500".to_string(),
//!     lead_name: Some("Anna".to_string()),
//!     source_id: source.id,
//!     message: Some("hello".to_string()),
//! }).await?;
//!
//! // Nobody is configured for the source yet
//! assert!(contact.operator.is_none());
//! # Ok(())
//! # }
//! ```

use sqlx::SqliteConnection;
use tracing::{info, warn};
use validator::Validate;

use crate::assignment::AssignmentEngine;
use crate::database::DatabaseManager;
use crate::resolver::resolve_lead;
use crate::store::RoutingStore;
use crate::types::{Contact, ContactRequest, ContactView, Lead, NewContact, Operator, Source};
use crate::{LeadError, Result};

/// Contact-ingestion workflow over the database and the assignment engine
#[derive(Debug)]
pub struct LeadRouter {
    database: DatabaseManager,
    engine: AssignmentEngine,
}

impl LeadRouter {
    pub fn new(database: DatabaseManager) -> Self {
        Self::with_engine(database, AssignmentEngine::new())
    }

    pub fn with_engine(database: DatabaseManager, engine: AssignmentEngine) -> Self {
        Self { database, engine }
    }

    /// Administrative and listing operations
    pub fn database(&self) -> &DatabaseManager {
        &self.database
    }

    pub fn engine(&self) -> &AssignmentEngine {
        &self.engine
    }

    /// Register one inbound contact
    ///
    /// Fails with `NotFound` when the source does not exist. Otherwise the
    /// contact is always created; `operator` is `None` when nobody was
    /// eligible.
    pub async fn register_contact(&self, request: ContactRequest) -> Result<ContactView> {
        request.validate()?;

        let mut tx = self.database.begin_write().await?;
        let outcome = self.assign_within(&mut tx, request).await;
        let (contact, lead, source, operator) = match outcome {
            Ok(assigned) => {
                tx.commit().await?;
                assigned
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback of contact registration failed: {}", rollback);
                }
                return Err(e);
            }
        };

        match &operator {
            Some(op) => info!(
                "Contact {} from source '{}' assigned to operator '{}'",
                contact.id, source.name, op.name
            ),
            None => info!(
                "Contact {} from source '{}' left unassigned: no eligible operator",
                contact.id, source.name
            ),
        }

        Ok(ContactView {
            id: contact.id,
            created_at: contact.created_at,
            is_active: contact.is_active,
            message: contact.message,
            lead,
            source,
            operator,
        })
    }

    async fn assign_within(
        &self,
        conn: &mut SqliteConnection,
        request: ContactRequest,
    ) -> Result<(Contact, Lead, Source, Option<Operator>)> {
        let source = sqlx::query_as::<_, Source>("SELECT id, name, code FROM sources WHERE id = ?")
            .bind(request.source_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| LeadError::not_found(format!("source {}", request.source_id)))?;

        let lead = resolve_lead_once_more_on_conflict(
            &mut *conn,
            &request.lead_external_id,
            request.lead_name.as_deref(),
        )
        .await?;

        let operator = self.engine.pick_operator(&mut *conn, source.id).await?;

        let contact = conn
            .insert_contact(NewContact {
                lead_id: lead.id,
                source_id: source.id,
                operator_id: operator.as_ref().map(|op| op.id),
                message: request.message,
            })
            .await?;

        Ok((contact, lead, source, operator))
    }
}

/// A concurrent writer may insert the same new lead first; its row is then
/// visible to a second resolution.
async fn resolve_lead_once_more_on_conflict(
    conn: &mut SqliteConnection,
    external_id: &str,
    name: Option<&str>,
) -> Result<Lead> {
    let first = resolve_lead(conn, external_id, name).await;
    match first {
        Err(LeadError::Conflict(reason)) => {
            warn!("Lead {} created concurrently ({}), resolving again", external_id, reason);
            resolve_lead(conn, external_id, name).await
        }
        other => other,
    }
}
