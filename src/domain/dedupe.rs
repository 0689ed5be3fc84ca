use std::{collections::HashSet, hash::Hash};

/// Keep the first item for every key, in original order.
pub fn remove_duplicates<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> K,
    K: Eq + Hash,
{
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(key(item))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_occurrence_in_order() {
        let items = vec![("GEN", 1), ("EXO", 2), ("GEN", 3), ("LEV", 4), ("EXO", 5)];
        let out = remove_duplicates(items, |(k, _)| *k);
        assert_eq!(out, vec![("GEN", 1), ("EXO", 2), ("LEV", 4)]);
    }

    #[test]
    fn empty_and_unique_inputs_pass_through() {
        let empty: Vec<(String, u8)> = vec![];
        assert!(remove_duplicates(empty, |(k, _)| k.clone()).is_empty());
        assert_eq!(remove_duplicates(vec![3, 1, 2], |n| *n), vec![3, 1, 2]);
    }

    #[test]
    fn one_element_per_distinct_key() {
        let out = remove_duplicates(vec![1, 1, 1, 2, 2, 1], |n| *n);
        assert_eq!(out, vec![1, 2]);
    }
}
