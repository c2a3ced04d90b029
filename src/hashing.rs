//! Hashed object names
//!
//! Runtime objects are stored under a name derived from their own identity
//! and the instance names of all their ancestors, so two objects with the
//! same display name under different parents never collide:
//!
//! ```text
//! sha1("roots.root.x.com:default/configs.config.x.com:configObj")
//! ```
//!
//! The same functions are used at compile time (for tests and the CLI) and by
//! runtimes holding a deserialized [`ParentIndex`].

use sha1::{Digest, Sha1};
use std::collections::HashMap;

use crate::names::DEFAULT_LABEL;
use crate::parents::ParentIndex;

/// Ancestor resource id paired with that ancestor's instance name, root first
pub type AncestorLabels = Vec<(String, String)>;

/// SHA-1 hex name of an object
///
/// Order-sensitive: `ancestors` must be root first, as returned by
/// [`ordered_ancestor_labels`].
pub fn hashed_name(resource_id: &str, ancestors: &[(String, String)], display_name: &str) -> String {
    let mut hasher = Sha1::new();
    for (ancestor, label) in ancestors {
        hasher.update(ancestor.as_bytes());
        hasher.update(b":");
        hasher.update(label.as_bytes());
        hasher.update(b"/");
    }
    hasher.update(resource_id.as_bytes());
    hasher.update(b":");
    hasher.update(display_name.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Ancestor chain of `resource_id` with instance names taken from `labels`
///
/// Ancestors without a label get `"default"`. An unknown resource id has no
/// ancestors.
pub fn ordered_ancestor_labels(
    index: &ParentIndex,
    resource_id: &str,
    labels: &HashMap<String, String>,
) -> AncestorLabels {
    index
        .parents(resource_id)
        .unwrap_or_default()
        .iter()
        .map(|parent| {
            let label = labels
                .get(parent)
                .cloned()
                .unwrap_or_else(|| DEFAULT_LABEL.to_string());
            (parent.clone(), label)
        })
        .collect()
}

/// [`hashed_name`] of an object given its ancestors' labels
pub fn object_name(
    index: &ParentIndex,
    resource_id: &str,
    labels: &HashMap<String, String>,
    display_name: &str,
) -> String {
    let ancestors = ordered_ancestor_labels(index, resource_id, labels);
    hashed_name(resource_id, &ancestors, display_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "roots.root.tsm.example.com";
    const CONFIG: &str = "configs.config.tsm.example.com";

    fn index() -> ParentIndex {
        let json = format!(
            r#"{{
                "{ROOT}": {{"name": "Root", "restName": "root.Root", "isSingleton": false, "parents": [], "children": {{}}, "links": {{}}}},
                "{CONFIG}": {{"name": "Config", "restName": "config.Config", "isSingleton": false, "parents": ["{ROOT}"], "children": {{}}, "links": {{}}}}
            }}"#
        );
        ParentIndex::from_json(&json).unwrap()
    }

    fn sha1_hex(input: &str) -> String {
        format!("{:x}", Sha1::digest(input.as_bytes()))
    }

    #[test]
    fn test_hashed_name_matches_layout() {
        let ancestors = vec![(ROOT.to_string(), "default".to_string())];
        let name = hashed_name(CONFIG, &ancestors, "configObj");
        assert_eq!(name, sha1_hex(&format!("{ROOT}:default/{CONFIG}:configObj")));
        assert_eq!(name.len(), 40);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_root_object_has_no_prefix() {
        assert_eq!(hashed_name(ROOT, &[], "default"), sha1_hex(&format!("{ROOT}:default")));
    }

    #[test]
    fn test_hashed_name_sensitivity() {
        let a = vec![(ROOT.to_string(), "default".to_string())];
        let b = vec![(ROOT.to_string(), "other".to_string())];
        let base = hashed_name(CONFIG, &a, "configObj");

        assert_eq!(base, hashed_name(CONFIG, &a, "configObj"));
        assert_ne!(base, hashed_name(CONFIG, &b, "configObj"));
        assert_ne!(base, hashed_name(CONFIG, &a, "configObj2"));
        assert_ne!(base, hashed_name(CONFIG, &[], "configObj"));

        let forward = vec![("x".to_string(), "1".to_string()), ("y".to_string(), "2".to_string())];
        let reversed: Vec<_> = forward.iter().rev().cloned().collect();
        assert_ne!(hashed_name(CONFIG, &forward, "c"), hashed_name(CONFIG, &reversed, "c"));
    }

    #[test]
    fn test_ordered_labels_default() {
        let index = index();
        let chain = ordered_ancestor_labels(&index, CONFIG, &HashMap::new());
        assert_eq!(chain, vec![(ROOT.to_string(), "default".to_string())]);

        let mut labels = HashMap::new();
        labels.insert(ROOT.to_string(), "r1".to_string());
        labels.insert("unrelated.pkg.x.com".to_string(), "ignored".to_string());
        let chain = ordered_ancestor_labels(&index, CONFIG, &labels);
        assert_eq!(chain, vec![(ROOT.to_string(), "r1".to_string())]);
    }

    #[test]
    fn test_unknown_resource_has_no_ancestors() {
        assert!(ordered_ancestor_labels(&index(), "nope.x.com", &HashMap::new()).is_empty());
        assert!(ordered_ancestor_labels(&index(), ROOT, &HashMap::new()).is_empty());
    }

    #[test]
    fn test_object_name() {
        let index = index();
        assert_eq!(
            object_name(&index, CONFIG, &HashMap::new(), "configObj"),
            sha1_hex(&format!("{ROOT}:default/{CONFIG}:configObj"))
        );
    }
}
