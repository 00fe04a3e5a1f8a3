//! Reference enricher: resolves an event's foreign keys into display data.
//!
//! The three lookups are independent. Each one is bounded by the configured
//! lookup timeout and degrades to `None` on failure, so a partially resolved
//! event is still deliverable.

use crate::domain::{CharacterRecord, Enrichment, RelayError};
use crate::ports::ReferenceLookup;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Resolves victim, killer and solar system for a change event.
pub struct ReferenceEnricher {
    lookup: Arc<dyn ReferenceLookup>,
    timeout: Duration,
}

impl ReferenceEnricher {
    pub fn new(lookup: Arc<dyn ReferenceLookup>, timeout: Duration) -> Self {
        Self { lookup, timeout }
    }

    /// Resolve all three references for an event at `at`.
    ///
    /// Lookups run concurrently. An absent id skips its lookup.
    pub async fn resolve(
        &self,
        victim_id: Option<i64>,
        killer_id: Option<i64>,
        system_id: Option<i64>,
        at: i64,
    ) -> Enrichment {
        let (victim, killer, system_name) = tokio::join!(
            self.character("victim", victim_id, at),
            self.character("killer", killer_id, at),
            self.system(system_id),
        );

        Enrichment {
            victim,
            killer,
            system_name,
        }
    }

    async fn character(
        &self,
        role: &'static str,
        id: Option<i64>,
        at: i64,
    ) -> Option<CharacterRecord> {
        let id = id?;
        self.bounded(role, id, self.lookup.character_at(id, at)).await
    }

    async fn system(&self, id: Option<i64>) -> Option<String> {
        let id = id?;
        self.bounded("solar_system", id, self.lookup.system_name(id))
            .await
    }

    async fn bounded<T, F>(&self, role: &'static str, id: i64, lookup: F) -> Option<T>
    where
        F: Future<Output = Result<Option<T>, RelayError>>,
    {
        let result = match tokio::time::timeout(self.timeout, lookup).await {
            Ok(result) => result,
            Err(_) => Err(RelayError::LookupTimeout(self.timeout)),
        };

        match result {
            Ok(found) => found,
            Err(e) => {
                warn!(role, id, error = %e, "Reference lookup failed, leaving fields empty");
                None
            }
        }
    }
}
