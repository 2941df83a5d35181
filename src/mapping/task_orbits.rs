//! Collection of distinct task mapping equivalence classes, identified by their representatives.

use crate::error::Result;
use crate::group::PermutationGroup;
use crate::mapping::{search, ReprOptions, TaskMapping};
use crate::perm::FHashMap;

#[derive(Clone, Debug, Default)]
pub struct TaskOrbits {
    class_ids: FHashMap<TaskMapping, usize>,
    representatives: Vec<TaskMapping>,
}

impl TaskOrbits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the class of a representative. Returns whether the class is new, and its id.
    /// Ids are assigned consecutively in insertion order.
    pub fn insert(&mut self, representative: TaskMapping) -> (bool, usize) {
        if let Some(&id) = self.class_ids.get(&representative) {
            return (false, id);
        }
        let id = self.representatives.len();
        self.class_ids.insert(representative.clone(), id);
        self.representatives.push(representative);
        (true, id)
    }

    /// Computes the representative of a mapping and records its class. With
    /// `options.match_known`, the search stops at the first recorded representative.
    pub fn insert_mapping(&mut self, group: &PermutationGroup, mapping: &[usize], options: &ReprOptions) -> Result<(bool, usize)> {
        let representative = search(group, mapping, Some(&*self), options)?;
        Ok(self.insert(representative))
    }

    pub fn contains(&self, representative: &[usize]) -> bool {
        self.class_ids.contains_key(representative)
    }

    pub fn class_id(&self, representative: &[usize]) -> Option<usize> {
        self.class_ids.get(representative).cloned()
    }

    pub fn num_orbits(&self) -> usize {
        self.representatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.representatives.is_empty()
    }

    /// Representatives in insertion order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item=&TaskMapping> + '_ {
        self.representatives.iter()
    }
}

impl<'a> IntoIterator for &'a TaskOrbits {
    type Item = &'a TaskMapping;
    type IntoIter = std::slice::Iter<'a, TaskMapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.representatives.iter()
    }
}
