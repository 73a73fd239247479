//! Content ordering and difficulty adaptation.

use skillpath_core::{Adaptation, AdaptedContent, Difficulty, LearningContent, LearningStyle, Skill};

/// Orders content for a learning style and adapts it to a difficulty.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentAdapter;

impl ContentAdapter {
    /// Stable reorder putting the style's preferred kind first.
    pub fn prioritize(&self, mut items: Vec<LearningContent>, style: LearningStyle) -> Vec<LearningContent> {
        if let Some(preferred) = style.preferred_content() {
            items.sort_by_key(|item| item.kind() != preferred);
        }
        items
    }

    /// Wrap one item with the adaptation for `difficulty`.
    pub fn adapt(&self, item: LearningContent, skill: &Skill, difficulty: Difficulty) -> AdaptedContent {
        let adaptation = match difficulty {
            Difficulty::Beginner => Adaptation::Scaffolded { hints: scaffolding(&item, skill) },
            Difficulty::Intermediate => Adaptation::Baseline,
            Difficulty::Advanced => Adaptation::Challenge { challenges: challenges(&item, skill) },
        };
        AdaptedContent { content: item, adaptation }
    }

    /// Prioritize then adapt a skill's whole content list.
    pub fn prepare(
        &self,
        items: Vec<LearningContent>,
        skill: &Skill,
        style: LearningStyle,
        difficulty: Difficulty,
    ) -> Vec<AdaptedContent> {
        self.prioritize(items, style)
            .into_iter()
            .map(|item| self.adapt(item, skill, difficulty))
            .collect()
    }
}

fn scaffolding(item: &LearningContent, skill: &Skill) -> Vec<String> {
    let specific = match item {
        LearningContent::Video { title, .. } => {
            format!("Pause after each segment of '{}' and restate the key idea", title)
        }
        LearningContent::Audio { title, .. } => format!("Take notes while listening to '{}'", title),
        LearningContent::Text { title, .. } => {
            format!("Skim the headings of '{}' before reading it in full", title)
        }
        LearningContent::Exercise { title, .. } => {
            format!("Work through '{}' with a worked example open", title)
        }
    };
    vec![specific, format!("Review what {} builds on before starting", skill.name)]
}

fn challenges(item: &LearningContent, skill: &Skill) -> Vec<String> {
    let specific = match item {
        LearningContent::Video { title, .. } => {
            format!("After '{}', build a small example that goes beyond it", title)
        }
        LearningContent::Audio { title, .. } => format!("Explain '{}' without your notes", title),
        LearningContent::Text { title, .. } => {
            format!("Summarise '{}' and find a case it does not cover", title)
        }
        LearningContent::Exercise { title, .. } => {
            format!("Solve '{}' again under a time limit without hints", title)
        }
    };
    vec![specific, format!("Connect {} to a harder {} topic", skill.name, skill.category)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillpath_core::ContentKind;

    fn catalog() -> Vec<LearningContent> {
        vec![
            LearningContent::Text { title: "Notes".into(), body_ref: "notes.md".into() },
            LearningContent::Exercise { title: "Drill".into(), instructions: "Repeat".into() },
            LearningContent::Video { title: "Intro".into(), url: "v1".into(), duration_minutes: 12 },
            LearningContent::Video { title: "Deep dive".into(), url: "v2".into(), duration_minutes: 30 },
        ]
    }

    #[test]
    fn test_prioritize_is_stable() {
        let ordered = ContentAdapter.prioritize(catalog(), LearningStyle::Visual);
        let titles: Vec<&str> = ordered.iter().map(|c| c.title()).collect();
        assert_eq!(titles, vec!["Intro", "Deep dive", "Notes", "Drill"]);
    }

    #[test]
    fn test_sequential_keeps_catalog_order() {
        let ordered = ContentAdapter.prioritize(catalog(), LearningStyle::Sequential);
        assert_eq!(ordered, catalog());
    }

    #[test]
    fn test_adaptation_per_difficulty() {
        let skill = Skill::new("a", "Algebra", 0, "math");
        let item = catalog().remove(1);
        assert_eq!(item.kind(), ContentKind::Exercise);

        let easy = ContentAdapter.adapt(item.clone(), &skill, Difficulty::Beginner);
        assert!(matches!(easy.adaptation, Adaptation::Scaffolded { ref hints } if !hints.is_empty()));

        let normal = ContentAdapter.adapt(item.clone(), &skill, Difficulty::Intermediate);
        assert_eq!(normal.adaptation, Adaptation::Baseline);

        let hard = ContentAdapter.adapt(item, &skill, Difficulty::Advanced);
        assert!(matches!(hard.adaptation, Adaptation::Challenge { ref challenges } if !challenges.is_empty()));
    }
}
