//! Post-processing of generated pathways.
//!
//! Enhancements regroup planned skills into bounded steps, honour the
//! learner's ordering preference, repair prerequisite violations introduced
//! by regrouping, and cover edge cases: empty pathways, missing intermediate
//! skills and oversized steps.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use skillpath_core::{
    CourseId, LearnerState, LearningStyle, Pathway, PathwayConfig, PlannedSkill, Skill, SkillId,
    StudentId,
};
use skillpath_graph::{GraphError, SkillGraph};
use skillpath_storage::Storage;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::generator::PathwayGenerator;

/// Anything that can be grouped by skill level.
pub trait Leveled {
    /// Id of the underlying skill.
    fn skill_id(&self) -> &SkillId;

    /// Level of the underlying skill.
    fn level(&self) -> u32;
}

impl Leveled for Skill {
    fn skill_id(&self) -> &SkillId {
        &self.id
    }

    fn level(&self) -> u32 {
        self.level
    }
}

impl Leveled for PlannedSkill {
    fn skill_id(&self) -> &SkillId {
        &self.skill.id
    }

    fn level(&self) -> u32 {
        self.skill.level
    }
}

/// Sort by (level, id) and fill groups greedily. A group closes when it
/// reaches `max_group_size` or the next level is more than one above the
/// group's first.
pub fn group_by_level<T: Leveled>(mut skills: Vec<T>, max_group_size: usize) -> Vec<Vec<T>> {
    let max = max_group_size.max(1);
    skills.sort_by(|a, b| a.level().cmp(&b.level()).then_with(|| a.skill_id().cmp(b.skill_id())));

    let mut groups: Vec<Vec<T>> = Vec::new();
    for skill in skills {
        match groups.last_mut() {
            Some(group) if group.len() < max && skill.level() - group[0].level() <= 1 => {
                group.push(skill)
            }
            _ => groups.push(vec![skill]),
        }
    }
    groups
}

/// Regroup for a learning style. Sequential learners get one skill per
/// group in ascending level order; other styles keep the grouping.
/// Prerequisite order is restored afterwards by
/// [`PathwayEnhancements::resolve_prerequisite_conflicts`], which keeps
/// singletons intact.
pub fn align_to_style<T: Leveled>(groups: Vec<Vec<T>>, style: LearningStyle) -> Vec<Vec<T>> {
    if style != LearningStyle::Sequential {
        return groups;
    }
    let mut flat: Vec<T> = groups.into_iter().flatten().collect();
    flat.sort_by_key(|s| s.level());
    flat.into_iter().map(|s| vec![s]).collect()
}

/// Split groups larger than `max_group_size` into consecutive chunks,
/// keeping relative order.
pub fn split_oversized<T>(groups: Vec<Vec<T>>, max_group_size: usize) -> Vec<Vec<T>> {
    let max = max_group_size.max(1);
    let mut out = Vec::with_capacity(groups.len());
    for group in groups {
        if group.len() <= max {
            out.push(group);
            continue;
        }
        let mut items = group.into_iter().peekable();
        while items.peek().is_some() {
            out.push(items.by_ref().take(max).collect());
        }
    }
    out
}

/// Pathway enhancements.
pub struct PathwayEnhancements {
    graph: Arc<SkillGraph>,
    storage: Arc<dyn Storage>,
    generator: Arc<PathwayGenerator>,
    max_group_size: usize,
}

impl PathwayEnhancements {
    /// Create enhancements planning over the generator's graph.
    pub fn new(generator: Arc<PathwayGenerator>, storage: Arc<dyn Storage>, config: &PathwayConfig) -> Self {
        Self {
            graph: generator.graph().clone(),
            storage,
            generator,
            max_group_size: config.max_group_size,
        }
    }

    /// Group skills of similar level into bounded groups.
    pub fn group_related_skills<T: Leveled>(&self, skills: Vec<T>) -> Vec<Vec<T>> {
        group_by_level(skills, self.max_group_size)
    }

    /// Apply the student's stored learning style to a grouping.
    /// Students without a profile keep the grouping.
    pub async fn align_with_learning_objectives<T: Leveled>(
        &self,
        groups: Vec<Vec<T>>,
        student: &StudentId,
    ) -> Result<Vec<Vec<T>>> {
        match self.storage.load_profile(student).await? {
            Some(profile) => Ok(align_to_style(groups, profile.learning_style)),
            None => Ok(groups),
        }
    }

    /// Reorder groups so that no skill precedes one of its prerequisites.
    ///
    /// Whole groups are moved first: they are stable-sorted topologically
    /// over the dependencies between groups, so membership and sizes are
    /// kept. Only groups that depend on each other in a cycle give up
    /// skills: there a skill moves to the latest group of its in-pathway
    /// ancestors. Within a group, prerequisites come first and otherwise
    /// the incoming order is kept. Duplicate skills keep their first
    /// occurrence. Empty groups are dropped.
    pub fn resolve_prerequisite_conflicts<T: Leveled>(&self, groups: Vec<Vec<T>>) -> Result<Vec<Vec<T>>> {
        let mut seen = HashSet::new();
        let mut deduped: Vec<Vec<T>> = Vec::with_capacity(groups.len());
        for group in groups {
            let mut kept = Vec::with_capacity(group.len());
            for item in group {
                if seen.insert(item.skill_id().clone()) {
                    kept.push(item);
                } else {
                    debug!(skill = %item.skill_id(), "dropping duplicate skill");
                }
            }
            if !kept.is_empty() {
                deduped.push(kept);
            }
        }

        let mut ancestors: HashMap<SkillId, HashSet<SkillId>> = HashMap::with_capacity(seen.len());
        let mut home: HashMap<SkillId, usize> = HashMap::with_capacity(seen.len());
        for (index, group) in deduped.iter().enumerate() {
            for item in group {
                let id = item.skill_id();
                let in_union = self.graph.ancestors(id)?.into_iter().filter(|a| seen.contains(a)).collect();
                ancestors.insert(id.clone(), in_union);
                home.insert(id.clone(), index);
            }
        }

        // Group i depends on group j when a skill of i has an ancestor in j
        let depends: Vec<BTreeSet<usize>> = deduped
            .iter()
            .enumerate()
            .map(|(index, group)| {
                group
                    .iter()
                    .flat_map(|item| ancestors[item.skill_id()].iter().map(|a| home[a]))
                    .filter(|j| *j != index)
                    .collect()
            })
            .collect();

        let mut slots: Vec<Option<Vec<T>>> = deduped.into_iter().map(Some).collect();
        let mut resolved = Vec::with_capacity(slots.len());
        for component in ordered_components(&depends) {
            let mut members: Vec<Vec<T>> = component.iter().filter_map(|i| slots[*i].take()).collect();
            if members.len() == 1 {
                resolved.append(&mut members);
            } else {
                debug!(groups = ?component, "groups depend on each other, moving skills");
                resolved.extend(self.move_skills_later(members, &ancestors));
            }
        }

        Ok(resolved
            .into_iter()
            .filter(|g| !g.is_empty())
            .map(|g| order_within_group(g, &ancestors))
            .collect())
    }

    /// Move each skill to the latest group among its own and those of its
    /// ancestors in `groups`. Buckets keep their positions and may end up
    /// empty.
    fn move_skills_later<T: Leveled>(
        &self,
        groups: Vec<Vec<T>>,
        ancestors: &HashMap<SkillId, HashSet<SkillId>>,
    ) -> Vec<Vec<T>> {
        let group_count = groups.len();
        let items: Vec<(usize, T)> = groups
            .into_iter()
            .enumerate()
            .flat_map(|(index, group)| group.into_iter().map(move |item| (index, item)))
            .collect();

        // An ancestor's in-union ancestors are a strict subset of its
        // dependent's, so ordering by count is topological.
        let mut order: Vec<(&SkillId, usize)> = items.iter().map(|(index, item)| (item.skill_id(), *index)).collect();
        order.sort_by_key(|(id, _)| (ancestors[*id].len(), self.graph.rank(id).unwrap_or(usize::MAX)));

        let mut assigned: HashMap<SkillId, usize> = HashMap::with_capacity(order.len());
        for (id, own) in order {
            let forced = ancestors[id].iter().filter_map(|a| assigned.get(a).copied()).max();
            assigned.insert(id.clone(), forced.map_or(own, |f| f.max(own)));
        }

        let mut buckets: Vec<Vec<T>> = (0..group_count).map(|_| Vec::new()).collect();
        for (own, item) in items {
            let index = assigned.get(item.skill_id()).copied().unwrap_or(own);
            if index != own {
                debug!(skill = %item.skill_id(), from = own, to = index, "moved skill after its prerequisites");
            }
            buckets[index].push(item);
        }
        buckets
    }

    /// Fix up a pathway after grouping.
    ///
    /// An empty pathway falls back to the course's entry skill. Skills that
    /// sit between two included skills in the graph but are missing from
    /// the pathway (and not yet mastered) are inserted as their own step
    /// before their first dependent. Finally, oversized steps are split.
    pub async fn handle_edge_cases(&self, mut pathway: Pathway) -> Result<Pathway> {
        let style = pathway.metadata.learning_style;
        let difficulty = pathway.metadata.difficulty;
        let learner = self
            .storage
            .load_learner_state(&pathway.student_id, &pathway.course_id)
            .await?;

        if pathway.is_empty() {
            match self.entry_skill(&pathway.course_id).await? {
                Some(skill) => {
                    info!(skill = %skill.id, "empty pathway, falling back to entry skill");
                    let planned = self
                        .generator
                        .plan_skill(&skill, learner.mastery_of(&skill.id), style, difficulty)
                        .await?;
                    pathway.set_groups(vec![vec![planned]]);
                }
                None => warn!(course = %pathway.course_id, "empty pathway and no skills to fall back to"),
            }
            return Ok(pathway);
        }

        let mut groups: Vec<Vec<PlannedSkill>> = std::mem::take(&mut pathway.steps)
            .into_iter()
            .map(|step| step.skills)
            .collect();

        let gaps = self.find_gaps(&groups, &learner, difficulty.mastery_threshold())?;
        if !gaps.is_empty() {
            for id in gaps {
                let skill = self.graph.skill(&id).ok_or_else(|| GraphError::SkillNotFound(id.clone()))?;
                let dependents = self.graph.descendants(&id)?;
                let position = groups
                    .iter()
                    .position(|g| g.iter().any(|p| dependents.contains(&p.skill.id)))
                    .unwrap_or(groups.len());
                debug!(skill = %id, position, "inserting missing intermediate skill");
                let planned = self
                    .generator
                    .plan_skill(&skill, learner.mastery_of(&id), style, difficulty)
                    .await?;
                groups.insert(position, vec![planned]);
            }
            groups = self.resolve_prerequisite_conflicts(groups)?;
        }

        pathway.set_groups(split_oversized(groups, self.max_group_size));
        Ok(pathway)
    }

    /// Full enhancement pass: group, align, resolve, then edge cases.
    pub async fn enhance(&self, mut pathway: Pathway) -> Result<Pathway> {
        let planned: Vec<PlannedSkill> = std::mem::take(&mut pathway.steps)
            .into_iter()
            .flat_map(|step| step.skills)
            .collect();

        let groups = self.group_related_skills(planned);
        let groups = if pathway.metadata.learning_style == LearningStyle::Sequential {
            align_to_style(groups, LearningStyle::Sequential)
        } else {
            self.align_with_learning_objectives(groups, &pathway.student_id).await?
        };
        let groups = self.resolve_prerequisite_conflicts(groups)?;
        pathway.set_groups(groups);

        self.handle_edge_cases(pathway).await
    }

    /// Missing skills that are ancestors of one included skill and
    /// descendants of another, in topological order.
    fn find_gaps(
        &self,
        groups: &[Vec<PlannedSkill>],
        learner: &LearnerState,
        threshold: f64,
    ) -> Result<Vec<SkillId>> {
        let included: HashSet<&SkillId> = groups.iter().flatten().map(|p| &p.skill.id).collect();

        let mut candidates = HashSet::new();
        for id in &included {
            for ancestor in self.graph.ancestors(id)? {
                if !included.contains(&ancestor) && learner.mastery_of(&ancestor) <= threshold {
                    candidates.insert(ancestor);
                }
            }
        }

        let mut gaps = Vec::new();
        for candidate in candidates {
            if self.graph.ancestors(&candidate)?.iter().any(|a| included.contains(a)) {
                gaps.push(candidate);
            }
        }
        Ok(self.graph.topological_order(&gaps)?)
    }

    /// Lowest-level skill of a course, or of the whole graph when the
    /// course lists no skills. Ties go to insertion order.
    async fn entry_skill(&self, course: &CourseId) -> Result<Option<Skill>> {
        let listed = self
            .storage
            .load_course(course)
            .await?
            .map(|c| c.skills)
            .unwrap_or_default();

        let pool: Vec<Skill> = if listed.is_empty() {
            self.graph.skills()
        } else {
            listed.iter().filter_map(|id| self.graph.skill(id)).collect()
        };

        Ok(pool
            .into_iter()
            .min_by_key(|s| (s.level, self.graph.rank(&s.id).unwrap_or(usize::MAX))))
    }
}

/// Strongly connected components of the group dependency graph, in a
/// stable topological order: a component is emitted once everything it
/// depends on is, earliest first group winning ties. Members are listed by
/// index.
fn ordered_components(depends: &[BTreeSet<usize>]) -> Vec<Vec<usize>> {
    let count = depends.len();
    let reach: Vec<HashSet<usize>> = (0..count).map(|i| reachable(depends, i)).collect();

    let mut component = vec![usize::MAX; count];
    let mut members: Vec<Vec<usize>> = Vec::new();
    for i in 0..count {
        if component[i] != usize::MAX {
            continue;
        }
        let cycle: Vec<usize> = (i..count)
            .filter(|j| *j == i || (reach[i].contains(j) && reach[*j].contains(&i)))
            .collect();
        for j in &cycle {
            component[*j] = members.len();
        }
        members.push(cycle);
    }

    let needs: Vec<BTreeSet<usize>> = members
        .iter()
        .enumerate()
        .map(|(c, cycle)| {
            cycle
                .iter()
                .flat_map(|i| depends[*i].iter().map(|j| component[*j]))
                .filter(|d| *d != c)
                .collect()
        })
        .collect();

    let mut emitted = vec![false; members.len()];
    let mut order = Vec::with_capacity(members.len());
    while order.len() < members.len() {
        // The condensation is acyclic, so some component is always ready
        let ready = (0..members.len())
            .find(|c| !emitted[*c] && needs[*c].iter().all(|d| emitted[*d]))
            .or_else(|| (0..members.len()).find(|c| !emitted[*c]));
        let Some(next) = ready else { break };
        emitted[next] = true;
        order.push(next);
    }

    order.into_iter().map(|c| std::mem::take(&mut members[c])).collect()
}

fn reachable(depends: &[BTreeSet<usize>], from: usize) -> HashSet<usize> {
    let mut seen = HashSet::new();
    let mut stack = vec![from];
    while let Some(i) = stack.pop() {
        for j in &depends[i] {
            if seen.insert(*j) {
                stack.push(*j);
            }
        }
    }
    seen
}

/// Stable topological order inside one group.
fn order_within_group<T: Leveled>(mut remaining: Vec<T>, ancestors: &HashMap<SkillId, HashSet<SkillId>>) -> Vec<T> {
    let mut ordered = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let next = remaining
            .iter()
            .position(|item| {
                let required = &ancestors[item.skill_id()];
                !remaining.iter().any(|other| required.contains(other.skill_id()))
            })
            .unwrap_or(0);
        ordered.push(remaining.remove(next));
    }
    ordered
}
