use std::collections::HashMap;

use crate::entry::Tier;

use super::LayerDistribution;

/// The three tier maps holding encoded payload bytes.
#[derive(Debug, Default)]
pub struct TierMaps {
    hot: HashMap<String, Vec<u8>>,
    warm: HashMap<String, Vec<u8>>,
    cold: HashMap<String, Vec<u8>>,
}

impl TierMaps {
    fn map(&self, tier: Tier) -> &HashMap<String, Vec<u8>> {
        match tier {
            Tier::Hot => &self.hot,
            Tier::Warm => &self.warm,
            Tier::Cold => &self.cold,
        }
    }

    fn map_mut(&mut self, tier: Tier) -> &mut HashMap<String, Vec<u8>> {
        match tier {
            Tier::Hot => &mut self.hot,
            Tier::Warm => &mut self.warm,
            Tier::Cold => &mut self.cold,
        }
    }

    pub fn get(&self, tier: Tier, key: &str) -> Option<&[u8]> {
        self.map(tier).get(key).map(Vec::as_slice)
    }

    pub fn contains(&self, tier: Tier, key: &str) -> bool {
        self.map(tier).contains_key(key)
    }

    pub fn insert(&mut self, tier: Tier, key: String, bytes: Vec<u8>) {
        self.map_mut(tier).insert(key, bytes);
    }

    pub fn remove(&mut self, tier: Tier, key: &str) -> Option<Vec<u8>> {
        self.map_mut(tier).remove(key)
    }

    /// Remove `key` from every tier. Returns how many tiers held it.
    pub fn remove_everywhere(&mut self, key: &str) -> usize {
        Tier::ALL
            .into_iter()
            .filter(|&tier| self.map_mut(tier).remove(key).is_some())
            .count()
    }

    /// Tiers currently holding `key` (exactly one for a consistent store).
    pub fn holding(&self, key: &str) -> Vec<Tier> {
        Tier::ALL
            .into_iter()
            .filter(|&tier| self.contains(tier, key))
            .collect()
    }

    /// Drop bytes whose key fails `keep`. Returns how many were dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let mut dropped = 0;
        for tier in Tier::ALL {
            let map = self.map_mut(tier);
            let before = map.len();
            map.retain(|k, _| keep(k.as_str()));
            dropped += before - map.len();
        }
        dropped
    }

    pub fn len(&self, tier: Tier) -> usize {
        self.map(tier).len()
    }

    pub fn distribution(&self) -> LayerDistribution {
        LayerDistribution {
            hot: self.hot.len(),
            warm: self.warm.len(),
            cold: self.cold.len(),
        }
    }

    pub fn clear(&mut self) {
        self.hot.clear();
        self.warm.clear();
        self.cold.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let mut tiers = TierMaps::default();
        tiers.insert(Tier::Warm, "k".into(), vec![1, 2, 3]);

        assert_eq!(tiers.get(Tier::Warm, "k"), Some(&[1u8, 2, 3][..]));
        assert_eq!(tiers.get(Tier::Hot, "k"), None);
        assert_eq!(tiers.holding("k"), vec![Tier::Warm]);

        assert_eq!(tiers.remove(Tier::Warm, "k"), Some(vec![1, 2, 3]));
        assert!(tiers.holding("k").is_empty());
    }

    #[test]
    fn test_remove_everywhere_and_retain() {
        let mut tiers = TierMaps::default();
        tiers.insert(Tier::Hot, "dup".into(), vec![0]);
        tiers.insert(Tier::Cold, "dup".into(), vec![0]);
        tiers.insert(Tier::Cold, "stray".into(), vec![0]);
        tiers.insert(Tier::Warm, "live".into(), vec![0]);

        assert_eq!(tiers.remove_everywhere("dup"), 2);
        assert_eq!(tiers.retain(|k| k == "live"), 1);
        assert_eq!(
            tiers.distribution(),
            LayerDistribution { hot: 0, warm: 1, cold: 0 }
        );
    }
}
