//! Planner facade: wires the collaborators and runs whole journeys.
//!
//! The planner owns nothing the pipeline modules could not be handed
//! directly — it is the composition root's convenience layer, mirroring the
//! original flow: resolve the destination, fetch the route, generate the
//! narrative, and absorb best-effort reflection failures.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{Destination, DestinationCatalog, DurableCatalog, MemoryCatalog};
use crate::config::PlannerConfig;
use crate::embed::{EmbeddingOracle, OllamaEmbedder};
use crate::error::{CatalogError, RouteError, ScribeResult};
use crate::index::ContextIndex;
use crate::llm::{GenerationOracle, OllamaClient};
use crate::narrative::{JourneyNarrative, JourneyRequest, NarrativeGenerator};
use crate::profile::{self, DurablePreferenceStore, MemoryPreferenceStore, PreferenceStore};
use crate::reflect::{ReflectionFeedback, ReflectionUpdater};
use crate::route::{Route, RouteClient, Router, TravelMode};

/// Everything a presentation layer needs to show one journey.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyPlan {
    pub destination: Destination,
    pub narrative: JourneyNarrative,
    /// `None` when no router is configured.
    pub route: Option<Route>,
}

/// Facade over the narrative generator, reflection updater, catalog, and
/// router.
pub struct JourneyPlanner {
    catalog: Arc<dyn DestinationCatalog>,
    generator: NarrativeGenerator,
    reflector: ReflectionUpdater,
    router: Option<Arc<dyn Router>>,
    travel_mode: TravelMode,
}

impl JourneyPlanner {
    /// Assemble a planner from explicit collaborators.
    ///
    /// Handles are injected rather than cached globally; the composition
    /// root owns their lifecycle.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<dyn DestinationCatalog>,
        preferences: Arc<dyn PreferenceStore>,
        embedder: Arc<dyn EmbeddingOracle>,
        index: Arc<ContextIndex>,
        oracle: Arc<dyn GenerationOracle>,
        router: Option<Arc<dyn Router>>,
        travel_mode: TravelMode,
        top_k: usize,
    ) -> Self {
        let generator = NarrativeGenerator::new(
            Arc::clone(&preferences),
            embedder,
            index,
            Arc::clone(&oracle),
            top_k,
        );
        let reflector = ReflectionUpdater::new(preferences, oracle);
        Self {
            catalog,
            generator,
            reflector,
            router,
            travel_mode,
        }
    }

    /// Build a planner with real collaborators from configuration.
    ///
    /// With a `data_dir`, the preference store and catalog share one durable
    /// database; without one, both are in-memory. A missing context index
    /// degrades to empty context rather than failing startup.
    pub fn open(config: &PlannerConfig) -> ScribeResult<Self> {
        let (preferences, catalog): (Arc<dyn PreferenceStore>, Arc<dyn DestinationCatalog>) =
            match &config.data_dir {
                Some(dir) => {
                    let db = profile::open_database(dir)?;
                    (
                        Arc::new(DurablePreferenceStore::new(Arc::clone(&db))),
                        Arc::new(DurableCatalog::new(db)),
                    )
                }
                None => (
                    Arc::new(MemoryPreferenceStore::new()),
                    Arc::new(MemoryCatalog::new()),
                ),
            };

        let index = Arc::new(match &config.context_index {
            Some(path) => ContextIndex::load_or_unavailable(path),
            None => ContextIndex::unavailable(),
        });

        let embedder: Arc<dyn EmbeddingOracle> =
            Arc::new(OllamaEmbedder::new(config.embedding.clone()));
        let oracle: Arc<dyn GenerationOracle> =
            Arc::new(OllamaClient::new(config.generation.clone()));
        let router: Option<Arc<dyn Router>> = config
            .routing
            .clone()
            .map(|rc| Arc::new(RouteClient::new(rc)) as Arc<dyn Router>);

        Ok(Self::new(
            catalog,
            preferences,
            embedder,
            index,
            oracle,
            router,
            config.travel_mode,
            config.top_k,
        ))
    }

    /// Plan one journey: resolve the destination, route to it, and generate
    /// the narrative.
    pub fn plan_journey(&self, request: &JourneyRequest) -> ScribeResult<JourneyPlan> {
        let (lat, lon) = request.origin;
        if !lat.is_finite() || !lon.is_finite() {
            return Err(RouteError::InvalidCoordinate { lon, lat }.into());
        }

        let destination = self
            .catalog
            .get_by_id(&request.destination_id)?
            .ok_or_else(|| CatalogError::NotFound {
                id: request.destination_id.clone(),
            })?;

        let route = match &self.router {
            Some(router) => Some(router.route(
                [lon, lat],
                [destination.lon, destination.lat],
                self.travel_mode,
            )?),
            None => None,
        };

        let narrative = self.generator.generate(request, &destination.name)?;

        Ok(JourneyPlan {
            destination,
            narrative,
            route,
        })
    }

    /// Apply post-journey feedback to the user's profile, best-effort.
    ///
    /// Reflection failures are logged and absorbed here; they never surface
    /// to the user-facing flow. The journey already shown is unaffected.
    pub fn reflect(&self, feedback: &ReflectionFeedback) {
        if let Err(e) = self.reflector.reflect_and_update(feedback) {
            tracing::warn!(
                user_id = %feedback.user_id,
                error = %e,
                "reflection skipped; profile unchanged"
            );
        }
    }

    /// Direct access to the narrative generator.
    pub fn generator(&self) -> &NarrativeGenerator {
        &self.generator
    }

    /// Direct access to the reflection updater (for callers that want the
    /// error instead of the absorbed form).
    pub fn reflector(&self) -> &ReflectionUpdater {
        &self.reflector
    }

    /// Direct access to the destination catalog.
    pub fn catalog(&self) -> &dyn DestinationCatalog {
        self.catalog.as_ref()
    }
}

impl std::fmt::Debug for JourneyPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JourneyPlanner")
            .field("travel_mode", &self.travel_mode)
            .field("routing", &self.router.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_memory_only_planner() {
        let planner = JourneyPlanner::open(&PlannerConfig::default()).unwrap();
        assert!(planner.catalog().get_by_id("poi-1").unwrap().is_none());
    }

    #[test]
    fn open_with_data_dir_creates_database() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = PlannerConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let planner = JourneyPlanner::open(&config).unwrap();
        assert!(planner.catalog().get_by_id("poi-1").unwrap().is_none());
        assert!(dir.path().join("wayscribe.redb").exists());
    }
}
