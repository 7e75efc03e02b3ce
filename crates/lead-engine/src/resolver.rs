//! # Lead Resolver
//!
//! Maps a caller-supplied external id onto a lead record, creating it on first
//! sight. The external id is the deduplication key; the `leads` table's
//! unique constraint is the backstop when two writers race on the same new
//! id, in which case the losing insert fails with
//! [`LeadError::Conflict`](crate::LeadError::Conflict) and the caller resolves
//! again to pick up the winner's lead.
//!
//! A lead's display name is written once: an existing lead without a name is
//! backfilled when a name is supplied, an existing name is never overwritten.
//! An empty name counts as no name, both supplied and stored.

use tracing::debug;

use crate::store::RoutingStore;
use crate::types::Lead;
use crate::Result;

/// Return the lead for `external_id`, creating it if needed
pub async fn resolve_lead<S>(store: &mut S, external_id: &str, display_name: Option<&str>) -> Result<Lead>
where
    S: RoutingStore + ?Sized,
{
    let display_name = display_name.filter(|name| !name.is_empty());

    if let Some(mut lead) = store.find_lead_by_external_id(external_id).await? {
        let unnamed = lead.name.as_deref().is_none_or(str::is_empty);
        if let (true, Some(name)) = (unnamed, display_name) {
            if store.update_lead_name(lead.id, name).await? {
                debug!("Lead {} name backfilled", lead.id);
                lead.name = Some(name.to_string());
            }
        }
        return Ok(lead);
    }

    let lead = store.insert_lead(external_id, display_name).await?;
    debug!("Lead {} created for external id {}", lead.id, external_id);
    Ok(lead)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::LeadError;

    #[tokio::test]
    async fn test_creates_then_reuses_lead() {
        let mut store = MemoryStore::default();

        let first = resolve_lead(&mut store, "tg-100", None).await.unwrap();
        let second = resolve_lead(&mut store, "tg-100", None).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.leads.len(), 1);
        assert!(second.name.is_none());
    }

    #[tokio::test]
    async fn test_backfills_missing_name_only() {
        let mut store = MemoryStore::default();

        resolve_lead(&mut store, "tg-101", None).await.unwrap();
        let named = resolve_lead(&mut store, "tg-101", Some("Ivan")).await.unwrap();
        assert_eq!(named.name.as_deref(), Some("Ivan"));

        let again = resolve_lead(&mut store, "tg-101", Some("Pyotr")).await.unwrap();
        assert_eq!(again.name.as_deref(), Some("Ivan"));
        assert_eq!(store.leads[0].name.as_deref(), Some("Ivan"));
    }

    #[tokio::test]
    async fn test_empty_name_counts_as_missing() {
        let mut store = MemoryStore::default();

        let lead = resolve_lead(&mut store, "tg-103", Some("")).await.unwrap();
        assert!(lead.name.is_none());

        let named = resolve_lead(&mut store, "tg-103", Some("Olga")).await.unwrap();
        assert_eq!(named.name.as_deref(), Some("Olga"));

        let kept = resolve_lead(&mut store, "tg-103", Some("")).await.unwrap();
        assert_eq!(kept.name.as_deref(), Some("Olga"));
    }

    #[tokio::test]
    async fn test_stored_empty_name_is_backfilled() {
        let mut store = MemoryStore::default();
        store.insert_lead("tg-104", Some("")).await.unwrap();

        let lead = resolve_lead(&mut store, "tg-104", Some("Maria")).await.unwrap();
        assert_eq!(lead.name.as_deref(), Some("Maria"));
        assert_eq!(store.leads[0].name.as_deref(), Some("Maria"));
    }

    #[tokio::test]
    async fn test_concurrent_insert_surfaces_conflict_then_resolves() {
        let mut store = MemoryStore::default();
        store.race_lead_insert("tg-102", Some("Winner"));

        let err = resolve_lead(&mut store, "tg-102", Some("Loser")).await.unwrap_err();
        assert!(matches!(err, LeadError::Conflict(_)));

        let lead = resolve_lead(&mut store, "tg-102", Some("Loser")).await.unwrap();
        assert_eq!(lead.name.as_deref(), Some("Winner"));
        assert_eq!(store.leads.len(), 1);
    }
}
