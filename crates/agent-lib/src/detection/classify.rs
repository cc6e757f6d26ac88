//! Mapping of detector labels to alerting categories

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const INTRUDER_LABELS: &[&str] = &["person", "dog"];

const ANIMAL_LABELS: &[&str] = &[
    "cat", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "bird",
];

const FEED_CONTAINER_LABELS: &[&str] = &["bowl", "cup", "bottle", "container"];

/// Semantic category of a detected object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectCategory {
    Intruder,
    Animal,
    FeedContainer,
    /// Drawn for visual feedback only
    Ignored,
}

impl ObjectCategory {
    /// Overlay colour used by the dashboard
    pub fn overlay_color(&self) -> &'static str {
        match self {
            ObjectCategory::Intruder => "red",
            ObjectCategory::Animal => "green",
            ObjectCategory::FeedContainer => "blue",
            ObjectCategory::Ignored => "gray",
        }
    }
}

/// Label sets driving classification
///
/// The default sets keep `dog` as an intruder trigger and out of the animal
/// set, and leave the generic `animal` label unclassified. Operators who count
/// dogs as livestock, or run a model emitting `animal`, override the lists in
/// config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationRules {
    pub intruder: BTreeSet<String>,
    pub animal: BTreeSet<String>,
    pub feed_container: BTreeSet<String>,
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self {
            intruder: to_set(INTRUDER_LABELS),
            animal: to_set(ANIMAL_LABELS),
            feed_container: to_set(FEED_CONTAINER_LABELS),
        }
    }
}

fn to_set(labels: &[&str]) -> BTreeSet<String> {
    labels.iter().map(|l| l.to_string()).collect()
}

impl ClassificationRules {
    /// Classify a label; total over all labels, unknown ones are ignored.
    /// When a label sits in several sets: intruder > animal > feed container.
    pub fn classify(&self, label: &str) -> ObjectCategory {
        if self.intruder.contains(label) {
            ObjectCategory::Intruder
        } else if self.animal.contains(label) {
            ObjectCategory::Animal
        } else if self.feed_container.contains(label) {
            ObjectCategory::FeedContainer
        } else {
            ObjectCategory::Ignored
        }
    }
}

/// Classify a label with the default rules
pub fn classify(label: &str) -> ObjectCategory {
    match label {
        l if INTRUDER_LABELS.contains(&l) => ObjectCategory::Intruder,
        l if ANIMAL_LABELS.contains(&l) => ObjectCategory::Animal,
        l if FEED_CONTAINER_LABELS.contains(&l) => ObjectCategory::FeedContainer,
        _ => ObjectCategory::Ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mapping() {
        assert_eq!(classify("person"), ObjectCategory::Intruder);
        assert_eq!(classify("dog"), ObjectCategory::Intruder);
        for label in ["cat", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "bird"] {
            assert_eq!(classify(label), ObjectCategory::Animal, "{}", label);
        }
        for label in ["bowl", "cup", "bottle", "container"] {
            assert_eq!(classify(label), ObjectCategory::FeedContainer, "{}", label);
        }
    }

    #[test]
    fn test_unknown_labels_are_ignored() {
        assert_eq!(classify("car"), ObjectCategory::Ignored);
        assert_eq!(classify(""), ObjectCategory::Ignored);
        // Labels are matched exactly
        assert_eq!(classify("Person"), ObjectCategory::Ignored);
    }

    #[test]
    fn test_rules_agree_with_free_function() {
        let rules = ClassificationRules::default();
        for label in ["person", "dog", "cow", "bird", "cup", "container", "truck", "animal"] {
            assert_eq!(rules.classify(label), classify(label), "{}", label);
        }
    }

    #[test]
    fn test_dog_policy_override() {
        let mut rules = ClassificationRules::default();
        rules.intruder.remove("dog");
        rules.animal.insert("dog".to_string());

        assert_eq!(rules.classify("dog"), ObjectCategory::Animal);
        assert_eq!(rules.classify("person"), ObjectCategory::Intruder);
    }

    #[test]
    fn test_generic_animal_label_is_opt_in() {
        assert_eq!(classify("animal"), ObjectCategory::Ignored);

        let mut rules = ClassificationRules::default();
        rules.animal.insert("animal".to_string());
        assert_eq!(rules.classify("animal"), ObjectCategory::Animal);
    }

    #[test]
    fn test_intruder_takes_precedence() {
        let mut rules = ClassificationRules::default();
        rules.animal.insert("dog".to_string());
        assert_eq!(rules.classify("dog"), ObjectCategory::Intruder);
    }

    #[test]
    fn test_overlay_colors() {
        assert_eq!(ObjectCategory::Intruder.overlay_color(), "red");
        assert_eq!(ObjectCategory::Animal.overlay_color(), "green");
        assert_eq!(ObjectCategory::FeedContainer.overlay_color(), "blue");
        assert_eq!(ObjectCategory::Ignored.overlay_color(), "gray");
    }

    #[test]
    fn test_partial_override_deserializes() {
        let rules: ClassificationRules =
            serde_json::from_str(r#"{"animal": ["cow", "dog"]}"#).unwrap();
        assert_eq!(rules.classify("dog"), ObjectCategory::Intruder);
        assert_eq!(rules.classify("sheep"), ObjectCategory::Ignored);
        assert_eq!(rules.classify("cup"), ObjectCategory::FeedContainer);
    }
}
