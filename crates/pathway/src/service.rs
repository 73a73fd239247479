//! Cached, enhanced pathway lookups.

use std::sync::Arc;

use skillpath_core::{Clock, Pathway, PathwayConfig, SystemClock};
use skillpath_graph::SkillGraph;
use skillpath_storage::{ContentCatalog, Storage};
use tracing::{debug, instrument};

use crate::cache::PathwayCache;
use crate::enhance::PathwayEnhancements;
use crate::error::Result;
use crate::generator::{PathwayGenerator, PathwayRequest};

/// Front door for pathway requests.
///
/// Serves the cached pathway of a (student, course) pair while it is fresh;
/// otherwise generates, enhances, persists and caches a new one. The cache
/// key ignores the request's targets, so callers changing targets should
/// use [`PathwayService::refresh`].
pub struct PathwayService {
    generator: Arc<PathwayGenerator>,
    enhancements: PathwayEnhancements,
    cache: Arc<PathwayCache>,
    storage: Arc<dyn Storage>,
}

impl PathwayService {
    /// Wire a service with the system clock.
    pub fn new(
        graph: Arc<SkillGraph>,
        storage: Arc<dyn Storage>,
        catalog: Arc<dyn ContentCatalog>,
        config: &PathwayConfig,
    ) -> Self {
        Self::with_clock(graph, storage, catalog, config, Arc::new(SystemClock))
    }

    /// Wire a service with an explicit clock.
    pub fn with_clock(
        graph: Arc<SkillGraph>,
        storage: Arc<dyn Storage>,
        catalog: Arc<dyn ContentCatalog>,
        config: &PathwayConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let generator = Arc::new(
            PathwayGenerator::new(graph, storage.clone(), catalog, config).with_clock(clock.clone()),
        );
        Self {
            enhancements: PathwayEnhancements::new(generator.clone(), storage.clone(), config),
            cache: Arc::new(PathwayCache::new(config.cache_ttl(), clock)),
            generator,
            storage,
        }
    }

    /// The underlying generator.
    pub fn generator(&self) -> &Arc<PathwayGenerator> {
        &self.generator
    }

    /// The enhancement pipeline.
    pub fn enhancements(&self) -> &PathwayEnhancements {
        &self.enhancements
    }

    /// The shared cache, for invalidation by analytics.
    pub fn cache(&self) -> &Arc<PathwayCache> {
        &self.cache
    }

    /// Cached pathway if fresh, otherwise a newly built one.
    #[instrument(skip(self, request), fields(student = %request.student_id, course = %request.course_id))]
    pub async fn pathway_for(&self, request: &PathwayRequest) -> Result<Pathway> {
        // Validate even on a hit so bad input never looks successful
        request.preferences()?;

        if let Some(pathway) = self.cache.get(&request.student_id, &request.course_id).await {
            debug!(pathway = %pathway.id, "cache hit");
            return Ok(pathway);
        }
        self.build(request).await
    }

    /// Drop any cached pathway and build a new one.
    pub async fn refresh(&self, request: &PathwayRequest) -> Result<Pathway> {
        self.cache.invalidate(&request.student_id, &request.course_id).await;
        self.build(request).await
    }

    async fn build(&self, request: &PathwayRequest) -> Result<Pathway> {
        let generated = self.generator.generate_pathway(request).await?;
        let pathway = self.enhancements.enhance(generated).await?;
        self.storage.save_pathway(&pathway).await?;
        self.cache.insert(pathway.clone()).await;
        Ok(pathway)
    }
}
