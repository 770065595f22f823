use std::marker::PhantomData;

use bimap::BiMap;

use crate::domain::utils::id::InstanceTag;
use crate::domain::workflow::region::Region;
use crate::error::{Error, Result};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Copy)]
pub struct RegionTag;

/// Bijection between names and dense indices, assigned in insertion order.
///
/// Deployments are vectors of region indices addressed by instance index, so all
/// downstream code works on integers only.
#[derive(Debug, Clone)]
pub struct Indexer<T> {
    map: BiMap<String, usize>,
    _marker: PhantomData<T>,
}

pub type InstanceIndexer = Indexer<InstanceTag>;
pub type RegionIndexer = Indexer<RegionTag>;

impl<T> Default for Indexer<T> {
    fn default() -> Self {
        Indexer { map: BiMap::new(), _marker: PhantomData }
    }
}

impl<T> Indexer<T> {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut indexer = Self::default();
        for value in values {
            indexer.insert(value);
        }
        indexer
    }

    /// Returns the index of `value`, assigning the next free one if it is new.
    pub fn insert(&mut self, value: impl Into<String>) -> usize {
        let value = value.into();
        if let Some(index) = self.map.get_by_left(&value) {
            return *index;
        }
        let index = self.map.len();
        self.map.insert(value, index);
        index
    }

    pub fn value_to_index(&self, value: &str) -> Result<usize> {
        self.map.get_by_left(value).copied().ok_or_else(|| Error::UnknownIdentifier(value.to_string()))
    }

    pub fn index_to_value(&self, index: usize) -> Result<&str> {
        self.map.get_by_right(&index).map(String::as_str).ok_or_else(|| Error::UnknownIdentifier(format!("index {}", index)))
    }

    /// All values ordered by index.
    pub fn values(&self) -> Vec<&str> {
        (0..self.map.len()).filter_map(|index| self.map.get_by_right(&index).map(String::as_str)).collect()
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        0..self.map.len()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl RegionIndexer {
    pub fn region(&self, index: usize) -> Result<Region> {
        self.index_to_value(index)?.parse()
    }

    pub fn region_index(&self, region: &Region) -> Result<usize> {
        self.value_to_index(&region.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_follow_insertion_order() {
        let indexer = InstanceIndexer::new(["b", "a", "c", "a"]);

        assert_eq!(indexer.len(), 3);
        assert_eq!(indexer.values(), vec!["b", "a", "c"]);
        assert_eq!(indexer.indices().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_round_trip_both_directions() {
        let indexer = RegionIndexer::new(["aws:us-east-1", "aws:eu-central-1"]);

        for value in indexer.values() {
            assert_eq!(indexer.index_to_value(indexer.value_to_index(value).unwrap()).unwrap(), value);
        }
        for index in indexer.indices() {
            assert_eq!(indexer.value_to_index(indexer.index_to_value(index).unwrap()).unwrap(), index);
        }
        assert_eq!(indexer.region(1).unwrap(), Region::new("aws", "eu-central-1"));
    }

    #[test]
    fn test_unknown_keys_fail_loudly() {
        let indexer = InstanceIndexer::new(["a"]);

        assert!(matches!(indexer.value_to_index("missing"), Err(Error::UnknownIdentifier(_))));
        assert!(matches!(indexer.index_to_value(7), Err(Error::UnknownIdentifier(_))));
    }
}
