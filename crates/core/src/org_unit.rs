//! Organizational-unit hierarchy: traversal, validation and content counters.
//!
//! Units form a forest via `parent_id`. The database layer loads the
//! `(id, parent_id, is_active)` triples into an [`OuForest`] and the per-unit
//! record tallies into [`DataTally`] rows; everything here is pure so the
//! recount can be verified without a database.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Maximum length of a unit name.
pub const MAX_NAME_LENGTH: usize = 200;

/// Minimal view of a unit needed for tree operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OuNode {
    pub id: DbId,
    pub parent_id: Option<DbId>,
    pub is_active: bool,
}

/// Signed/unsigned record counts for one data type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    pub signed: i64,
    pub unsigned: i64,
}

impl TypeCount {
    pub fn total(&self) -> i64 {
        self.signed + self.unsigned
    }

    fn add(&mut self, other: &TypeCount) {
        self.signed += other.signed;
        self.unsigned += other.unsigned;
    }
}

/// Denormalized per-type counters stored in `org_units.data_counter`.
///
/// A `BTreeMap` keeps the serialized JSON stable across recounts.
pub type DataCounter = BTreeMap<String, TypeCount>;

/// Active-record count for one `(unit, data type, signed)` group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTally {
    pub org_unit_id: DbId,
    pub data_type: String,
    pub is_signed: bool,
    pub count: i64,
}

/// In-memory parent-pointer forest.
#[derive(Debug, Clone, Default)]
pub struct OuForest {
    nodes: HashMap<DbId, OuNode>,
    children: HashMap<DbId, Vec<DbId>>,
}

impl OuForest {
    /// Build the forest. Children lists are sorted by id for deterministic
    /// traversal order.
    pub fn new(nodes: impl IntoIterator<Item = OuNode>) -> Self {
        let nodes: HashMap<DbId, OuNode> = nodes.into_iter().map(|n| (n.id, n)).collect();
        let mut children: HashMap<DbId, Vec<DbId>> = HashMap::new();
        for node in nodes.values() {
            if let Some(parent) = node.parent_id {
                children.entry(parent).or_default().push(node.id);
            }
        }
        for list in children.values_mut() {
            list.sort_unstable();
        }
        Self { nodes, children }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: DbId) -> Option<&OuNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: DbId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Units with no parent, or whose parent is missing from the forest.
    pub fn roots(&self) -> Vec<DbId> {
        let mut roots: Vec<DbId> = self
            .nodes
            .values()
            .filter(|n| n.parent_id.is_none_or(|p| !self.nodes.contains_key(&p)))
            .map(|n| n.id)
            .collect();
        roots.sort_unstable();
        roots
    }

    pub fn children_of(&self, id: DbId) -> &[DbId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Breadth-first descendants of `id` with their depth relative to `id`
    /// (children are 1).
    ///
    /// The start node itself is not included.
    pub fn descendants(&self, id: DbId) -> Vec<(DbId, i32)> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut queue: VecDeque<(DbId, i32)> =
            self.children_of(id).iter().map(|&c| (c, 1)).collect();

        while let Some((current, depth)) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            out.push((current, depth));
            for &child in self.children_of(current) {
                queue.push_back((child, depth + 1));
            }
        }
        out
    }

    /// Parent chain of `id`, nearest first. Stops on a missing parent or a
    /// repeated id.
    pub fn ancestors(&self, id: DbId) -> Vec<DbId> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = self.nodes.get(&id).and_then(|n| n.parent_id);

        while let Some(parent) = current {
            if !seen.insert(parent) {
                break;
            }
            let Some(node) = self.nodes.get(&parent) else {
                break;
            };
            out.push(parent);
            current = node.parent_id;
        }
        out
    }

    /// A unit is reachable when it is active and every ancestor up to a root
    /// exists and is active.
    pub fn is_reachable(&self, id: DbId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        if !node.is_active {
            return false;
        }

        let mut seen = HashSet::from([id]);
        let mut current = node.parent_id;
        while let Some(parent) = current {
            if !seen.insert(parent) {
                return false;
            }
            match self.nodes.get(&parent) {
                Some(p) if p.is_active => current = p.parent_id,
                _ => return false,
            }
        }
        true
    }

    /// All reachable unit ids, sorted.
    pub fn reachable_ids(&self) -> BTreeSet<DbId> {
        let mut out = BTreeSet::new();
        let mut queue: VecDeque<DbId> = self
            .nodes
            .values()
            .filter(|n| n.parent_id.is_none() && n.is_active)
            .map(|n| n.id)
            .collect();

        while let Some(id) = queue.pop_front() {
            if !out.insert(id) {
                continue;
            }
            for &child in self.children_of(id) {
                if self.nodes.get(&child).is_some_and(|c| c.is_active) {
                    queue.push_back(child);
                }
            }
        }
        out
    }

    /// Union of the start units, their ancestors and their descendants.
    pub fn graph(&self, ids: &[DbId]) -> BTreeSet<DbId> {
        let mut out = BTreeSet::new();
        for &id in ids {
            if !self.contains(id) {
                continue;
            }
            out.insert(id);
            out.extend(self.ancestors(id));
            out.extend(self.descendants(id).into_iter().map(|(d, _)| d));
        }
        out
    }
}

/// Validate a unit name.
pub fn validate_name(name: &str) -> Result<(), CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Organizational unit name must not be empty".to_string(),
        ));
    }
    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Organizational unit name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Check that `unit_id` can hold `Data` records.
///
/// The unit must exist and be reachable from an active root through active
/// units; records anywhere else would drop out of every counter roll-up.
pub fn validate_record_unit(forest: &OuForest, unit_id: DbId) -> Result<(), CoreError> {
    if !forest.contains(unit_id) {
        return Err(CoreError::NotFound {
            entity: "OrgUnit",
            id: unit_id,
        });
    }
    if !forest.is_reachable(unit_id) {
        return Err(CoreError::Validation(format!(
            "Organizational unit {unit_id} is inactive or not reachable from an active root"
        )));
    }
    Ok(())
}

/// Validate placing `unit_id` under `new_parent`.
///
/// `unit_id` is `None` for a unit that does not exist yet. The parent must
/// exist, and an existing unit may not become its own ancestor.
pub fn validate_parent(
    forest: &OuForest,
    unit_id: Option<DbId>,
    new_parent: Option<DbId>,
) -> Result<(), CoreError> {
    let Some(parent) = new_parent else {
        return Ok(());
    };

    if !forest.contains(parent) {
        return Err(CoreError::NotFound {
            entity: "OrgUnit",
            id: parent,
        });
    }

    if let Some(id) = unit_id {
        if id == parent {
            return Err(CoreError::Validation(
                "An organizational unit cannot be its own parent".to_string(),
            ));
        }
        if forest.descendants(id).iter().any(|&(d, _)| d == parent) {
            return Err(CoreError::Validation(format!(
                "Moving unit {id} under {parent} would create a cycle"
            )));
        }
    }
    Ok(())
}

/// Recompute `data_counter` for every unit in the forest.
///
/// A unit's counter holds the records attached to it plus the counters of its
/// active children; inactive children and everything below them contribute
/// nothing. Every unit in the forest gets an entry, possibly empty, so the
/// result can replace all stored counters at once. Running this twice over
/// the same input yields identical output.
pub fn compute_counters(forest: &OuForest, tallies: &[DataTally]) -> BTreeMap<DbId, DataCounter> {
    let mut own: HashMap<DbId, DataCounter> = HashMap::new();
    for tally in tallies {
        if !forest.contains(tally.org_unit_id) || tally.count <= 0 {
            continue;
        }
        let entry = own
            .entry(tally.org_unit_id)
            .or_default()
            .entry(tally.data_type.clone())
            .or_default();
        if tally.is_signed {
            entry.signed += tally.count;
        } else {
            entry.unsigned += tally.count;
        }
    }

    // Breadth-first order from the roots; processing it in reverse visits
    // every child before its parent.
    let mut order = Vec::with_capacity(forest.len());
    let mut visited = HashSet::new();
    let mut queue: VecDeque<DbId> = forest.roots().into();
    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        order.push(id);
        queue.extend(forest.children_of(id).iter().copied());
    }

    // Nodes caught in a cycle are never reached from a root; they keep only
    // their own counts.
    let mut stranded: Vec<DbId> = forest
        .nodes
        .keys()
        .copied()
        .filter(|id| !visited.contains(id))
        .collect();
    stranded.sort_unstable();

    let mut counters: BTreeMap<DbId, DataCounter> = BTreeMap::new();
    for &id in order.iter().rev() {
        let mut counter = own.get(&id).cloned().unwrap_or_default();
        for &child in forest.children_of(id) {
            let child_active = forest.get(child).is_some_and(|c| c.is_active);
            if !child_active {
                continue;
            }
            if let Some(child_counter) = counters.get(&child) {
                for (data_type, count) in child_counter {
                    counter.entry(data_type.clone()).or_default().add(count);
                }
            }
        }
        counters.insert(id, counter);
    }
    for id in stranded {
        counters.insert(id, own.get(&id).cloned().unwrap_or_default());
    }

    counters
}
