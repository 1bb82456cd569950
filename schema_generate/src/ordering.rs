//! Deterministic iteration over unordered maps.
//!
//! Keys are sorted byte-wise, so equal key sets always render in the same
//! order no matter how the map was filled or which hasher it uses.

use std::collections::HashMap;
use std::hash::BuildHasher;

/// The keys of `map`, sorted lexicographically.
#[must_use]
pub fn ordered_keys<V, S: BuildHasher>(map: &HashMap<String, V, S>) -> Vec<&str> {
    ordered_entries(map)
        .into_iter()
        .map(|(key, _)| key)
        .collect()
}

/// The entries of `map`, sorted lexicographically by key.
#[must_use]
pub fn ordered_entries<V, S: BuildHasher>(map: &HashMap<String, V, S>) -> Vec<(&str, &V)> {
    let mut entries: Vec<(&str, &V)> = map.iter().map(|(key, value)| (key.as_str(), value)).collect();
    entries.sort_unstable_by(|(left, _), (right, _)| left.cmp(right));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_from(keys: &[&str]) -> HashMap<String, usize> {
        keys.iter()
            .enumerate()
            .map(|(index, key)| ((*key).to_string(), index))
            .collect()
    }

    #[test]
    fn keys_are_sorted() {
        let map = map_from(&["b", "c", "a"]);
        assert_eq!(vec!["a", "b", "c"], ordered_keys(&map));
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let forward = map_from(&["Widget", "Address", "Person", "Zone", "Item"]);
        let backward = map_from(&["Item", "Zone", "Person", "Address", "Widget"]);
        assert_eq!(ordered_keys(&forward), ordered_keys(&backward));
    }

    #[test]
    fn ordering_is_byte_wise() {
        // Uppercase sorts before lowercase, digits before letters.
        let map = map_from(&["b", "B", "a", "A", "1"]);
        assert_eq!(vec!["1", "A", "B", "a", "b"], ordered_keys(&map));
    }

    #[test]
    fn prefix_sorts_first() {
        let map = map_from(&["FooBar", "Foo"]);
        assert_eq!(vec!["Foo", "FooBar"], ordered_keys(&map));
    }

    #[test]
    fn entries_carry_their_values() {
        let mut map: HashMap<String, &str> = HashMap::new();
        map.insert("z".to_string(), "last");
        map.insert("a".to_string(), "first");
        assert_eq!(vec![("a", &"first"), ("z", &"last")], ordered_entries(&map));
    }

    #[test]
    fn empty_map_yields_nothing() {
        let map: HashMap<String, usize> = HashMap::new();
        assert!(ordered_keys(&map).is_empty());
    }
}
