//! # Operator Assignment Engine
//!
//! Picks the operator that receives a new contact arriving through a source.
//!
//! ## Algorithm
//!
//! ```text
//!  weight configs of source ──► active operators only ──► load snapshot
//!                                                            │
//!                                         load < max_load    ▼
//!                                  ┌──────────────── candidates (by operator id)
//!                                  │                         │
//!                                  │                 weighted draw
//!                                  │                         │
//!                                  │                         ▼
//!                                  │                  recheck operator
//!                                  │               ┌─────────┴─────────┐
//!                                  │         under capacity       full / inactive
//!                                  │               │                   │
//!                                  │           Assigned        drop candidate
//!                                  └───────────────────────────────────┘
//!                                        (empty set ──► no operator)
//! ```
//!
//! The load snapshot is taken without locks, so the chosen operator is
//! re-read before it is returned. The loop shrinks the candidate list by one
//! on every rejection and therefore runs at most once per candidate.
//!
//! Two concurrent assignments can still both pass the recheck for the same
//! operator before either contact commits; the cap is best-effort under
//! concurrency.
//!
//! "No operator" is `Ok(None)`, never an error: the contact is then stored
//! unassigned.

mod selection;

pub use selection::{select_weighted, RandomDraw, WeightDraw};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::store::RoutingStore;
use crate::types::{Operator, SourceId, WeightedOperator};
use crate::Result;

/// Weighted, load-capped operator selection
pub struct AssignmentEngine {
    draw: Mutex<Box<dyn WeightDraw>>,
}

impl Default for AssignmentEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AssignmentEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssignmentEngine").finish_non_exhaustive()
    }
}

impl AssignmentEngine {
    /// Engine drawing from an entropy-seeded generator
    pub fn new() -> Self {
        Self::with_draw(RandomDraw::from_entropy())
    }

    /// Engine drawing from the given source, e.g. a seeded or scripted one
    pub fn with_draw(draw: impl WeightDraw + 'static) -> Self {
        Self {
            draw: Mutex::new(Box::new(draw)),
        }
    }

    /// Select an operator for a new contact from `source_id`
    ///
    /// Runs entirely on `store`, which the caller scopes to its transaction.
    pub async fn pick_operator<S>(&self, store: &mut S, source_id: SourceId) -> Result<Option<Operator>>
    where
        S: RoutingStore + ?Sized,
    {
        let configs = store.list_active_weight_configs(source_id).await?;
        if configs.is_empty() {
            debug!("Source {}: no active operators configured", source_id);
            return Ok(None);
        }

        let operator_ids: Vec<_> = configs.iter().map(|c| c.operator.id).collect();
        let loads = store.count_active_contacts(&operator_ids).await?;

        let mut candidates: Vec<WeightedOperator> = configs
            .into_iter()
            .filter(|c| loads.get(&c.operator.id).copied().unwrap_or(0) < c.operator.max_load)
            .collect();
        candidates.sort_by_key(|c| c.operator.id);

        debug!(
            "Source {}: {} of {} operators under capacity",
            source_id,
            candidates.len(),
            operator_ids.len()
        );

        while !candidates.is_empty() {
            // Selecting
            let chosen = {
                let mut draw = self.draw.lock();
                select_weighted(&candidates, draw.as_mut()).map(|c| c.operator.id)
            };
            let Some(operator_id) = chosen else {
                debug!("Source {}: remaining candidates all have zero weight", source_id);
                return Ok(None);
            };

            // Rechecking
            match store.operator_load(operator_id).await? {
                Some(load) if load.has_capacity() => {
                    info!(
                        "Source {}: assigned operator {} ({}/{})",
                        source_id, operator_id, load.active_contacts, load.operator.max_load
                    );
                    return Ok(Some(load.operator));
                }
                load => {
                    debug!(
                        "Source {}: operator {} rejected on recheck ({:?}), retrying",
                        source_id,
                        operator_id,
                        load.map(|l| (l.operator.active, l.active_contacts, l.operator.max_load))
                    );
                    candidates.retain(|c| c.operator.id != operator_id);
                }
            }
        }

        debug!("Source {}: every candidate exhausted", source_id);
        Ok(None)
    }
}
