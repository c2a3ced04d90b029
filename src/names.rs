//! Resource Naming
//!
//! Derives the identity strings the rest of the compiler keys on:
//!
//! - `resource_id("Config", "config", "tsm.example.com")` -> `configs.config.tsm.example.com`
//! - `gvk_field_tag("ServiceGroup")` -> `serviceGroupGvk`
//!
//! Identity depends only on type name, declaring package and base domain, never
//! on where in the source tree the type lives.

use regex::Regex;
use std::sync::OnceLock;

/// Sentinel instance name for singletons and missing ancestor labels
pub const DEFAULT_LABEL: &str = "default";

/// Type and field names a datamodel may not use
pub const RESERVED_NAMES: &[&str] = &[
    "Kind",
    "Resource",
    "Id",
    "ApiVersion",
    "Metadata",
    "ObjectMeta",
    "TypeMeta",
    "Labels",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// True if a package name contains anything outside `[a-z0-9]`
pub fn has_special_chars(name: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]").expect("static regex"))
        .is_match(name)
}

/// `<plural>.<pkg>.<domain>`
pub fn resource_id(type_name: &str, package: &str, base_domain: &str) -> String {
    format!("{}.{}", group_resource_name(type_name), group_name(package, base_domain))
}

/// `<pkg>.<domain>`
pub fn group_name(package: &str, base_domain: &str) -> String {
    format!("{}.{}", package, base_domain)
}

/// Lowercase plural, e.g. `AccessControlPolicy` -> `accesscontrolpolicies`
pub fn group_resource_name(type_name: &str) -> String {
    to_plural(type_name).to_lowercase()
}

/// `<pkg>.<Type>`
pub fn rest_name(package: &str, type_name: &str) -> String {
    format!("{}.{}", package, type_name)
}

/// Field name with a lowercased first letter, as used in tags
pub fn tag_name(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Tag-safe reference field name: `ServiceGroup` -> `serviceGroupGvk`
pub fn gvk_field_tag(field: &str) -> String {
    format!("{}Gvk", tag_name(field))
}

/// Identifier reference field name: `ServiceGroup` -> `ServiceGroupGvk`
pub fn gvk_field_name(field: &str) -> String {
    format!("{}Gvk", field)
}

// =============================================================================
// Pluralization
// =============================================================================

const PLURAL_EXCEPTIONS: &[(&str, &str)] = &[("Endpoints", "Endpoints")];

/// English pluralization of a type name
pub fn to_plural(singular: &str) -> String {
    if let Some((_, plural)) = PLURAL_EXCEPTIONS.iter().find(|(s, _)| *s == singular) {
        return plural.to_string();
    }

    let chars: Vec<char> = singular.chars().collect();
    if chars.len() < 2 {
        return singular.to_string();
    }
    let last = chars[chars.len() - 1].to_ascii_lowercase();
    let before = chars[chars.len() - 2].to_ascii_lowercase();

    match last {
        's' | 'x' | 'z' => format!("{}es", singular),
        'y' if is_consonant(before) => format!("{}ies", &singular[..singular.len() - 1]),
        'h' if before == 'c' || before == 's' => format!("{}es", singular),
        'e' if before == 'f' => format!("{}ves", &singular[..singular.len() - 2]),
        'f' => format!("{}ves", &singular[..singular.len() - 1]),
        _ => format!("{}s", singular),
    }
}

fn is_consonant(c: char) -> bool {
    c.is_ascii_alphabetic() && !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id() {
        assert_eq!(
            resource_id("Config", "config", "tsm.example.com"),
            "configs.config.tsm.example.com"
        );
        assert_eq!(
            resource_id("AccessControlPolicy", "policy", "tsm.example.com"),
            "accesscontrolpolicies.policy.tsm.example.com"
        );
    }

    #[test]
    fn test_plural_rules() {
        assert_eq!(to_plural("Gns"), "Gnses");
        assert_eq!(to_plural("Box"), "Boxes");
        assert_eq!(to_plural("Policy"), "Policies");
        assert_eq!(to_plural("Gateway"), "Gateways");
        assert_eq!(to_plural("Branch"), "Branches");
        assert_eq!(to_plural("Leaf"), "Leaves");
        assert_eq!(to_plural("Knife"), "Knives");
        assert_eq!(to_plural("Root"), "Roots");
        assert_eq!(to_plural("Endpoints"), "Endpoints");
        assert_eq!(to_plural("A"), "A");
    }

    #[test]
    fn test_gvk_names() {
        assert_eq!(gvk_field_tag("ServiceGroup"), "serviceGroupGvk");
        assert_eq!(gvk_field_name("ServiceGroup"), "ServiceGroupGvk");
        assert_eq!(gvk_field_tag("GNS"), "gNSGvk");
    }

    #[test]
    fn test_package_name_chars() {
        assert!(!has_special_chars("config2"));
        assert!(has_special_chars("service-group"));
        assert!(has_special_chars("Config"));
        assert!(has_special_chars("my_pkg"));
    }

    #[test]
    fn test_reserved() {
        assert!(is_reserved("Kind"));
        assert!(!is_reserved("Config"));
    }
}
