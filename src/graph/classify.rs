//! Field classification
//!
//! Sorts the fields of a node into graph relations and plain spec data using
//! the `nexus` annotation. Classification never looks at what a type refers
//! to; resolving targets is the builder's job.

use crate::dsl::{Field, Record, NEXUS_GRAPHQL_KEY, NEXUS_KEY};
use crate::error::{CompilerError, Result};

/// Role of a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    /// Plain data, part of the resource spec
    Spec,
    /// Owned single child
    Child,
    /// Owned named children
    Children,
    /// Non-owning single reference
    Link,
    /// Non-owning named references
    Links,
    Status,
    /// Excluded from spec fields via `nexus-graphql = "ignore:true"`
    Ignored,
}

/// Ownership of a graph edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Child,
    Link,
}

/// A graph edge described by a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Relation {
    pub kind: RelationKind,
    /// Plural cardinality, addressed by instance name
    pub named: bool,
}

impl FieldRole {
    /// Graph relation of this role, if any
    pub fn relation(&self) -> Option<Relation> {
        let (kind, named) = match self {
            Self::Child => (RelationKind::Child, false),
            Self::Children => (RelationKind::Child, true),
            Self::Link => (RelationKind::Link, false),
            Self::Links => (RelationKind::Link, true),
            _ => return None,
        };
        Some(Relation { kind, named })
    }
}

/// Role of a field from its annotations
pub fn classify_field(field: &Field) -> FieldRole {
    let role = field.annotation_value(NEXUS_KEY).map(str::to_ascii_lowercase);
    match role.as_deref() {
        Some("child") => return FieldRole::Child,
        Some("children") => return FieldRole::Children,
        Some("link") => return FieldRole::Link,
        Some("links") => return FieldRole::Links,
        Some("status") => return FieldRole::Status,
        _ => {}
    }

    let ignored = field
        .annotation_value(NEXUS_GRAPHQL_KEY)
        .map(|v| {
            let compact: String = v.chars().filter(|c| !c.is_whitespace()).collect();
            compact.eq_ignore_ascii_case("ignore:true")
        })
        .unwrap_or(false);
    if ignored {
        FieldRole::Ignored
    } else {
        FieldRole::Spec
    }
}

/// Fields of one node partitioned by role, each list in declaration order
#[derive(Debug, Default)]
pub struct Classification<'a> {
    pub spec: Vec<&'a Field>,
    pub relations: Vec<(&'a Field, Relation)>,
    pub status: Option<&'a Field>,
    pub ignored: Vec<&'a Field>,
}

/// Classify every field of a record
pub fn classify(record: &Record) -> Result<Classification<'_>> {
    let mut out = Classification::default();
    let mut status_fields = Vec::new();

    for field in &record.fields {
        let role = classify_field(field);
        if let Some(relation) = role.relation() {
            out.relations.push((field, relation));
            continue;
        }
        match role {
            FieldRole::Status => status_fields.push(field),
            FieldRole::Ignored => out.ignored.push(field),
            _ => out.spec.push(field),
        }
    }

    if status_fields.len() > 1 {
        return Err(CompilerError::MultipleStatusFields {
            node: record.name.clone(),
            fields: status_fields.iter().map(|f| f.name.clone()).collect(),
        });
    }
    out.status = status_fields.pop();

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{parse_file, Item};

    fn record(src: &str) -> Record {
        let file = parse_file(src).unwrap();
        match file.items.into_iter().next().unwrap() {
            Item::Record(r) => r,
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_roles() {
        let r = record(
            r#"package config;
            node Config {
                GNS: gns.Gns [nexus = "child"];
                Clusters: Cluster [nexus = "Children"];
                Owner: User [nexus = "link"];
                Policies: Policy [nexus = "links"];
                State: ConfigState [nexus = "status"];
                Secret: string [nexus-graphql = "ignore:true"];
                Instance: float32 [json = "instance"];
            }"#,
        );
        let c = classify(&r).unwrap();

        let spec: Vec<_> = c.spec.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(spec, vec!["Instance"]);
        assert_eq!(c.ignored.len(), 1);
        assert_eq!(c.status.map(|f| f.name.as_str()), Some("State"));

        let relations: Vec<_> = c
            .relations
            .iter()
            .map(|(f, r)| (f.name.as_str(), r.kind, r.named))
            .collect();
        assert_eq!(
            relations,
            vec![
                ("GNS", RelationKind::Child, false),
                ("Clusters", RelationKind::Child, true),
                ("Owner", RelationKind::Link, false),
                ("Policies", RelationKind::Link, true),
            ]
        );
    }

    #[test]
    fn test_graphql_ignore_tolerates_spacing() {
        let r = record(
            r#"package a;
            node A {
                Spaced: string [nexus-graphql = "ignore: true"];
                Padded: string [nexus-graphql = " IGNORE : true "];
                Other: string [nexus-graphql = "type:String"];
            }"#,
        );
        let c = classify(&r).unwrap();
        let ignored: Vec<_> = c.ignored.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(ignored, vec!["Spaced", "Padded"]);
        let spec: Vec<_> = c.spec.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(spec, vec!["Other"]);
    }

    #[test]
    fn test_unknown_nexus_value_is_spec() {
        let r = record(r#"package a; node A { X: string [nexus = "something"]; }"#);
        let c = classify(&r).unwrap();
        assert_eq!(c.spec.len(), 1);
        assert!(c.relations.is_empty());
    }

    #[test]
    fn test_multiple_status_fields() {
        let r = record(
            r#"package a; node A { S1: string [nexus = "status"]; S2: string [nexus = "status"]; }"#,
        );
        match classify(&r).unwrap_err() {
            CompilerError::MultipleStatusFields { node, fields } => {
                assert_eq!(node, "A");
                assert_eq!(fields, vec!["S1", "S2"]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
