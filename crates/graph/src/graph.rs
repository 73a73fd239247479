//! The skill dependency graph.

use skillpath_core::{PrerequisiteEdge, Skill, SkillId};
use skillpath_storage::Storage;
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::error::{GraphError, Result};
use crate::traversal::{self, Adjacency};

#[derive(Default)]
struct GraphInner {
    skills: HashMap<SkillId, Skill>,
    /// Skill ids in first-insertion order
    order: Vec<SkillId>,
    /// Skill id -> position in `order`
    rank: HashMap<SkillId, usize>,
    /// skill -> [prerequisites]
    prerequisites: Adjacency,
    /// prerequisite -> [dependents]
    dependents: Adjacency,
    /// All edges in insertion order
    edges: Vec<PrerequisiteEdge>,
}

impl GraphInner {
    fn require(&self, id: &SkillId) -> Result<&Skill> {
        self.skills
            .get(id)
            .ok_or_else(|| GraphError::SkillNotFound(id.clone()))
    }

    fn collect_skills(&self, ids: &[SkillId]) -> Vec<Skill> {
        ids.iter().filter_map(|id| self.skills.get(id).cloned()).collect()
    }
}

/// Directed acyclic graph of skills and prerequisite edges.
///
/// Mutations validate and insert under one exclusive write lock; reads share a
/// read lock. No lock is held across an `.await`.
#[derive(Default)]
pub struct SkillGraph {
    inner: RwLock<GraphInner>,
}

impl SkillGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, GraphInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GraphInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load every skill and edge from storage, skipping edges that fail
    /// validation.
    pub async fn from_storage(storage: &dyn Storage) -> Result<Self> {
        let graph = Self::new();
        for skill in storage.list_skills().await? {
            graph.add_skill(skill)?;
        }
        for edge in storage.list_prerequisites().await? {
            if let Err(e) = graph.add_prerequisite(&edge.skill, &edge.prerequisite) {
                warn!("Skipping stored prerequisite {} -> {}: {}", edge.skill, edge.prerequisite, e);
            }
        }
        info!("Loaded skill graph: {} skills, {} edges", graph.len(), graph.edge_count());
        Ok(graph)
    }

    /// Write every skill and edge to storage.
    pub async fn persist_to(&self, storage: &dyn Storage) -> Result<()> {
        let (skills, edges) = {
            let inner = self.read();
            (inner.collect_skills(&inner.order), inner.edges.clone())
        };
        for skill in &skills {
            storage.save_skill(skill).await?;
        }
        for edge in &edges {
            storage.save_prerequisite(edge).await?;
        }
        Ok(())
    }

    /// Insert or replace a skill by id.
    ///
    /// Replacing a skill with a level that would break the ordering of its
    /// existing edges fails with [`GraphError::LevelOrderViolation`].
    pub fn add_skill(&self, skill: Skill) -> Result<()> {
        let mut inner = self.write();

        if inner.skills.contains_key(&skill.id) {
            for prerequisite in inner.prerequisites.get(&skill.id).into_iter().flatten() {
                let prerequisite_level = inner.skills[prerequisite].level;
                if prerequisite_level > skill.level {
                    return Err(GraphError::LevelOrderViolation {
                        skill: skill.id.clone(),
                        skill_level: skill.level,
                        prerequisite: prerequisite.clone(),
                        prerequisite_level,
                    });
                }
            }
            for dependent in inner.dependents.get(&skill.id).into_iter().flatten() {
                let dependent_level = inner.skills[dependent].level;
                if skill.level > dependent_level {
                    return Err(GraphError::LevelOrderViolation {
                        skill: dependent.clone(),
                        skill_level: dependent_level,
                        prerequisite: skill.id.clone(),
                        prerequisite_level: skill.level,
                    });
                }
            }
        } else {
            let position = inner.order.len();
            inner.rank.insert(skill.id.clone(), position);
            inner.order.push(skill.id.clone());
        }

        debug!("Upserted skill {} (level {})", skill.id, skill.level);
        inner.skills.insert(skill.id.clone(), skill);
        Ok(())
    }

    /// Record that `skill_id` requires `prerequisite_id`.
    ///
    /// Rejects edges that would close a cycle, then edges whose prerequisite
    /// outranks the dependent. The graph is unchanged on error; re-adding an
    /// existing edge is a no-op.
    pub fn add_prerequisite(&self, skill_id: &SkillId, prerequisite_id: &SkillId) -> Result<()> {
        let mut inner = self.write();
        let skill_level = inner.require(skill_id)?.level;
        let prerequisite_level = inner.require(prerequisite_id)?.level;

        if inner
            .prerequisites
            .get(skill_id)
            .is_some_and(|p| p.contains(prerequisite_id))
        {
            return Ok(());
        }

        // A cycle closes if skill_id is already (transitively) required by prerequisite_id.
        if traversal::reaches(&inner.prerequisites, prerequisite_id, skill_id) {
            return Err(GraphError::CycleDetected {
                skill: skill_id.clone(),
                prerequisite: prerequisite_id.clone(),
            });
        }

        if prerequisite_level > skill_level {
            return Err(GraphError::LevelOrderViolation {
                skill: skill_id.clone(),
                skill_level,
                prerequisite: prerequisite_id.clone(),
                prerequisite_level,
            });
        }

        inner
            .prerequisites
            .entry(skill_id.clone())
            .or_default()
            .push(prerequisite_id.clone());
        inner
            .dependents
            .entry(prerequisite_id.clone())
            .or_default()
            .push(skill_id.clone());
        inner
            .edges
            .push(PrerequisiteEdge::new(skill_id.clone(), prerequisite_id.clone()));

        debug!("Added prerequisite {} -> {}", skill_id, prerequisite_id);
        Ok(())
    }

    /// Remove an edge. Returns whether it existed.
    pub fn remove_prerequisite(&self, skill_id: &SkillId, prerequisite_id: &SkillId) -> Result<bool> {
        let mut inner = self.write();
        inner.require(skill_id)?;
        inner.require(prerequisite_id)?;

        let before = inner.edges.len();
        inner
            .edges
            .retain(|e| !(&e.skill == skill_id && &e.prerequisite == prerequisite_id));
        if inner.edges.len() == before {
            return Ok(false);
        }
        if let Some(list) = inner.prerequisites.get_mut(skill_id) {
            list.retain(|p| p != prerequisite_id);
        }
        if let Some(list) = inner.dependents.get_mut(prerequisite_id) {
            list.retain(|d| d != skill_id);
        }
        debug!("Removed prerequisite {} -> {}", skill_id, prerequisite_id);
        Ok(true)
    }

    /// Direct prerequisites of a skill, in edge insertion order.
    pub fn get_prerequisites(&self, id: &SkillId) -> Result<Vec<Skill>> {
        let inner = self.read();
        inner.require(id)?;
        Ok(inner
            .prerequisites
            .get(id)
            .map(|ids| inner.collect_skills(ids))
            .unwrap_or_default())
    }

    /// Skills that directly require `id`, in edge insertion order.
    pub fn get_next_skills(&self, id: &SkillId) -> Result<Vec<Skill>> {
        let inner = self.read();
        inner.require(id)?;
        Ok(inner
            .dependents
            .get(id)
            .map(|ids| inner.collect_skills(ids))
            .unwrap_or_default())
    }

    /// Shortest learning sequence from `start` to `target`, both inclusive,
    /// following prerequisite -> dependent edges.
    pub fn shortest_path(&self, start: &SkillId, target: &SkillId) -> Result<Vec<SkillId>> {
        let inner = self.read();
        inner.require(start)?;
        inner.require(target)?;
        traversal::bfs_path(&inner.dependents, start, target).ok_or_else(|| GraphError::NotReachable {
            from: start.clone(),
            to: target.clone(),
        })
    }

    /// All transitive prerequisites of a skill.
    pub fn ancestors(&self, id: &SkillId) -> Result<HashSet<SkillId>> {
        let inner = self.read();
        inner.require(id)?;
        Ok(traversal::closure(&inner.prerequisites, id))
    }

    /// All skills that transitively require `id`.
    pub fn descendants(&self, id: &SkillId) -> Result<HashSet<SkillId>> {
        let inner = self.read();
        inner.require(id)?;
        Ok(traversal::closure(&inner.dependents, id))
    }

    /// Skills without prerequisites from which `id` can be reached
    /// (including `id` itself), in insertion order.
    pub fn roots_of(&self, id: &SkillId) -> Result<Vec<SkillId>> {
        let inner = self.read();
        inner.require(id)?;
        let mut candidates = traversal::closure(&inner.prerequisites, id);
        candidates.insert(id.clone());
        Ok(inner
            .order
            .iter()
            .filter(|s| candidates.contains(*s))
            .filter(|s| inner.prerequisites.get(*s).map_or(true, |p| p.is_empty()))
            .cloned()
            .collect())
    }

    /// Order `subset` so that prerequisites precede dependents; ties keep
    /// insertion order. Unknown ids fail with [`GraphError::SkillNotFound`].
    pub fn topological_order(&self, subset: &[SkillId]) -> Result<Vec<SkillId>> {
        let inner = self.read();
        for id in subset {
            inner.require(id)?;
        }
        Ok(traversal::topological_order(
            &inner.prerequisites,
            &inner.dependents,
            &inner.rank,
            subset,
        ))
    }

    /// Direct prerequisite ids of a skill (empty for unknown skills).
    pub fn prerequisite_ids(&self, id: &SkillId) -> Vec<SkillId> {
        self.read().prerequisites.get(id).cloned().unwrap_or_default()
    }

    /// Look up a skill.
    pub fn skill(&self, id: &SkillId) -> Option<Skill> {
        self.read().skills.get(id).cloned()
    }

    /// Whether a skill exists.
    pub fn contains(&self, id: &SkillId) -> bool {
        self.read().skills.contains_key(id)
    }

    /// Insertion rank of a skill, used for deterministic tie-breaking.
    pub fn rank(&self, id: &SkillId) -> Option<usize> {
        self.read().rank.get(id).copied()
    }

    /// All skills in insertion order.
    pub fn skills(&self) -> Vec<Skill> {
        let inner = self.read();
        inner.collect_skills(&inner.order)
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> Vec<PrerequisiteEdge> {
        self.read().edges.clone()
    }

    /// Number of skills.
    pub fn len(&self) -> usize {
        self.read().skills.len()
    }

    /// Whether the graph has no skills.
    pub fn is_empty(&self) -> bool {
        self.read().skills.is_empty()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.read().edges.len()
    }
}
