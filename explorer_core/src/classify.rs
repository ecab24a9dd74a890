// classify.rs - Bottom-up display classification of the exploration tree
//
// A node's class depends on every child's class, so resolution walks the
// spawn tree in post-order with an explicit stack and memoizes per snapshot.

use crate::forest::{Exploration, ForestSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

pub const PALETTE_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

pub const WINNER_COLOR: Rgb = Rgb::new(255, 109, 0);
pub const DEAD_COLOR: Rgb = Rgb::new(158, 158, 158);

pub const HUE_PALETTE: [(&str, Rgb); PALETTE_SIZE] = [
    ("blue", Rgb::new(33, 150, 243)),
    ("purple", Rgb::new(156, 39, 176)),
    ("deep-orange", Rgb::new(255, 87, 34)),
    ("light-green", Rgb::new(139, 195, 74)),
    ("cyan", Rgb::new(0, 188, 212)),
    ("pink", Rgb::new(233, 30, 99)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "class", content = "slot", rename_all = "snake_case")]
pub enum DisplayClass {
    Victory,
    Dead,
    Hue(usize),
}

impl DisplayClass {
    fn own_hue(exploration: &Exploration) -> Self {
        DisplayClass::Hue(exploration.color_slot % PALETTE_SIZE)
    }

    pub fn color(self) -> Rgb {
        match self {
            DisplayClass::Victory => WINNER_COLOR,
            DisplayClass::Dead => DEAD_COLOR,
            DisplayClass::Hue(slot) => HUE_PALETTE[slot % PALETTE_SIZE].1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DisplayClass::Victory => "victory",
            DisplayClass::Dead => "dead",
            DisplayClass::Hue(slot) => HUE_PALETTE[slot % PALETTE_SIZE].0,
        }
    }
}

impl fmt::Display for DisplayClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything a renderer needs to draw one exploration's path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayStyle {
    pub class: DisplayClass,
    pub line_weight: u32,
    pub opacity: f32,
    pub z_priority: u8,
}

impl DisplayStyle {
    pub fn for_class(class: DisplayClass) -> Self {
        let (line_weight, opacity, z_priority) = match class {
            DisplayClass::Victory => (3, 1.0, 10),
            DisplayClass::Dead => (2, 0.5, 2),
            DisplayClass::Hue(_) => (2, 0.9, 5),
        };
        Self {
            class,
            line_weight,
            opacity,
            z_priority,
        }
    }

    pub fn color(&self) -> Rgb {
        self.class.color()
    }
}

/// Memoizing classifier bound to one set of explorations.
pub struct Classifier<'a> {
    explorations: &'a BTreeMap<String, Exploration>,
    children: HashMap<&'a str, Vec<&'a Exploration>>,
    memo: HashMap<&'a str, DisplayClass>,
}

impl<'a> Classifier<'a> {
    pub fn new(explorations: &'a BTreeMap<String, Exploration>) -> Self {
        let mut children: HashMap<&'a str, Vec<&'a Exploration>> = HashMap::new();
        for exploration in explorations.values() {
            if let Some(parent) = exploration.parent_id.as_deref() {
                if let Some((parent_key, _)) = explorations.get_key_value(parent) {
                    children.entry(parent_key.as_str()).or_default().push(exploration);
                }
            }
        }
        Self {
            explorations,
            children,
            memo: HashMap::with_capacity(explorations.len()),
        }
    }

    /// Class of `id`, `None` when the id is not part of this snapshot.
    pub fn resolve(&mut self, id: &str) -> Option<DisplayClass> {
        let explorations = self.explorations;
        let root = explorations.get(id)?;
        if let Some(class) = self.memo.get(id) {
            return Some(*class);
        }

        let mut on_stack: HashSet<&'a str> = HashSet::new();
        let mut stack: Vec<(&'a Exploration, bool)> = vec![(root, false)];

        while let Some((node, expanded)) = stack.pop() {
            let key = node.id.as_str();
            if self.memo.contains_key(key) {
                continue;
            }
            if expanded {
                let class = self.decide(node);
                on_stack.remove(key);
                self.memo.insert(key, class);
                continue;
            }

            on_stack.insert(key);
            stack.push((node, true));
            if let Some(kids) = self.children.get(key) {
                for &kid in kids {
                    // A child already on the stack means the parent links loop;
                    // `decide` falls back to that child's own hue.
                    if !self.memo.contains_key(kid.id.as_str()) && !on_stack.contains(kid.id.as_str()) {
                        stack.push((kid, false));
                    }
                }
            }
        }

        self.memo.get(id).copied()
    }

    /// Children must already be memoized (or be part of a cycle).
    fn decide(&self, node: &Exploration) -> DisplayClass {
        if node.found_goal {
            return DisplayClass::Victory;
        }

        let kids = self.children.get(node.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
        if kids.is_empty() {
            return if node.is_dead {
                DisplayClass::Dead
            } else {
                DisplayClass::own_hue(node)
            };
        }

        let mut classes = kids.iter().map(|kid| {
            self.memo
                .get(kid.id.as_str())
                .copied()
                .unwrap_or_else(|| DisplayClass::own_hue(kid))
        });
        let first = classes.next().unwrap_or_else(|| DisplayClass::own_hue(node));
        if classes.all(|class| class == first) {
            first
        } else {
            DisplayClass::own_hue(node)
        }
    }

    pub fn style(&mut self, id: &str) -> Option<DisplayStyle> {
        self.resolve(id).map(DisplayStyle::for_class)
    }

    /// Styles for every exploration, keyed by id.
    pub fn classify_all(mut self) -> BTreeMap<String, DisplayStyle> {
        let explorations = self.explorations;
        explorations
            .keys()
            .filter_map(|id| self.style(id).map(|style| (id.clone(), style)))
            .collect()
    }
}

/// Display style of `exploration` given the rest of `snapshot`.
pub fn classify(exploration: &Exploration, snapshot: &ForestSnapshot) -> DisplayStyle {
    let class = Classifier::new(&snapshot.explorations)
        .resolve(&exploration.id)
        .unwrap_or_else(|| {
            if exploration.found_goal {
                DisplayClass::Victory
            } else if exploration.is_dead {
                DisplayClass::Dead
            } else {
                DisplayClass::own_hue(exploration)
            }
        });
    DisplayStyle::for_class(class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::ForestStats;
    use crate::types::Position;

    fn node(id: &str, parent: Option<&str>, slot: usize) -> Exploration {
        Exploration {
            id: id.to_string(),
            start_position: Position::new(1, 1),
            current_position: Position::new(1, 1),
            path: vec![Position::new(1, 1)],
            parent_id: parent.map(str::to_string),
            child_ids: Vec::new(),
            is_active: true,
            is_complete: false,
            is_dead: false,
            found_goal: false,
            generation: 0,
            color_slot: slot,
        }
    }

    fn dead(mut e: Exploration) -> Exploration {
        e.is_dead = true;
        e.is_complete = true;
        e.is_active = false;
        e
    }

    fn forest(nodes: Vec<Exploration>) -> BTreeMap<String, Exploration> {
        nodes.into_iter().map(|e| (e.id.clone(), e)).collect()
    }

    #[test]
    fn test_uniform_subtree_inherits_leaf_color() {
        // root -> mid -> {leaf_a, leaf_b}; both leaves land on palette slot 3.
        let explorations = forest(vec![
            node("root", None, 0),
            node("mid", Some("root"), 1),
            node("leaf_a", Some("mid"), 3),
            node("leaf_b", Some("mid"), 9),
        ]);
        let mut classifier = Classifier::new(&explorations);
        assert_eq!(classifier.resolve("leaf_b"), Some(DisplayClass::Hue(3)));
        assert_eq!(classifier.resolve("mid"), Some(DisplayClass::Hue(3)));
        assert_eq!(classifier.resolve("root"), Some(DisplayClass::Hue(3)));
    }

    #[test]
    fn test_mixed_siblings_fall_back_to_parent_slot() {
        let explorations = forest(vec![
            node("parent", None, 4),
            node("left", Some("parent"), 1),
            node("right", Some("parent"), 2),
        ]);
        let mut classifier = Classifier::new(&explorations);
        assert_eq!(classifier.resolve("parent"), Some(DisplayClass::Hue(4)));
        assert_eq!(classifier.resolve("left"), Some(DisplayClass::Hue(1)));
    }

    #[test]
    fn test_victory_beats_everything_and_propagates() {
        let mut winner = node("winner", Some("junction"), 2);
        winner.found_goal = true;
        let explorations = forest(vec![node("root", None, 0), node("junction", Some("root"), 1), winner]);

        let styles = Classifier::new(&explorations).classify_all();
        for id in ["root", "junction", "winner"] {
            assert_eq!(styles[id].class, DisplayClass::Victory);
        }
        assert_eq!(styles["root"].line_weight, 3);
        assert_eq!(styles["root"].z_priority, 10);
        assert_eq!(styles["root"].color().hex(), "#FF6D00");
    }

    #[test]
    fn test_dead_leaves_and_dead_subtrees() {
        let mut winner = node("winner", Some("root"), 2);
        winner.found_goal = true;
        let explorations = forest(vec![
            node("root", None, 5),
            winner,
            node("fork", Some("root"), 1),
            dead(node("dead_a", Some("fork"), 3)),
            dead(node("dead_b", Some("fork"), 4)),
        ]);
        let mut classifier = Classifier::new(&explorations);
        assert_eq!(classifier.resolve("dead_a"), Some(DisplayClass::Dead));
        assert_eq!(classifier.resolve("fork"), Some(DisplayClass::Dead));
        assert_eq!(classifier.resolve("root"), Some(DisplayClass::Hue(5)));

        let style = classifier.style("dead_b").unwrap();
        assert_eq!(style.opacity, 0.5);
        assert_eq!(style.color(), DEAD_COLOR);
    }

    #[test]
    fn test_deep_chain_resolves_without_recursion() {
        let depth = 50_000;
        let mut nodes = vec![node("n0", None, 0)];
        for i in 1..depth {
            nodes.push(node(&format!("n{i}"), Some(&format!("n{}", i - 1)), i));
        }
        let explorations = forest(nodes);
        let leaf_class = DisplayClass::Hue((depth - 1) % PALETTE_SIZE);
        assert_eq!(Classifier::new(&explorations).resolve("n0"), Some(leaf_class));
    }

    #[test]
    fn test_parent_cycle_terminates() {
        let explorations = forest(vec![node("a", Some("b"), 1), node("b", Some("a"), 2)]);
        let mut classifier = Classifier::new(&explorations);
        assert!(classifier.resolve("a").is_some());
        assert!(classifier.resolve("b").is_some());
        assert_eq!(classifier.resolve("missing"), None);
    }

    #[test]
    fn test_classify_against_snapshot() {
        let explorations = forest(vec![node("root", None, 0), node("kid", Some("root"), 1)]);
        let snapshot = ForestSnapshot {
            explorations,
            global_stats: ForestStats::default(),
        };
        let root = &snapshot.explorations["root"];
        assert_eq!(classify(root, &snapshot).class, DisplayClass::Hue(1));

        let stranger = dead(node("stranger", None, 3));
        assert_eq!(classify(&stranger, &snapshot).class, DisplayClass::Dead);
        assert_eq!(DisplayClass::Hue(1).label(), "purple");
    }
}
