//! Declaration Language
//!
//! Syntax tree for `.nexus` datamodel files. A file declares one package,
//! its imports, and a list of items:
//!
//! ```text
//! package config;
//!
//! import "example.com/datamodel/config/gns";
//! import py "example.com/datamodel/config/policy";
//!
//! #[query = "root.GeneralQuerySpec"]
//! node Config {
//!     GNS: gns.Gns [nexus = "child"];
//!     ACPPolicies: py.AccessControlPolicy [nexus = "links"];
//!     Instance: float32;
//!     Secret: string [nexus-graphql = "ignore:true"];
//! }
//! ```
//!
//! Field annotations are ordered key/value pairs; `nexus` carries the graph
//! relationship, everything else is passed through to generators.

pub mod parser;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use parser::parse_file;

/// Annotation key that carries the graph relationship of a field
pub const NEXUS_KEY: &str = "nexus";

/// Annotation key for GraphQL-related field options
pub const NEXUS_GRAPHQL_KEY: &str = "nexus-graphql";

/// Annotation key renaming a query argument
pub const ALIAS_NAME_KEY: &str = "nexus-alias-name";

/// Annotation key overriding a query argument type
pub const ALIAS_TYPE_KEY: &str = "nexus-alias-type";

// =============================================================================
// Files
// =============================================================================

/// One parsed `.nexus` file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub package: String,
    pub imports: Vec<Import>,
    pub items: Vec<Item>,
}

/// `import [alias] "path";`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub path: String,
}

impl Import {
    /// Last segment of the import path (`a/b/gns` -> `gns`)
    pub fn last_segment(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Top-level declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Record(Record),
    QuerySpec(QuerySpecDecl),
}

// =============================================================================
// Records
// =============================================================================

/// What kind of record a declaration is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// `node Foo { .. }`
    Node,
    /// `singleton node Foo { .. }`
    SingletonNode,
    /// `type Foo { .. }` - plain data, never a graph resource
    Plain,
}

impl RecordKind {
    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node | Self::SingletonNode)
    }
}

/// A struct-like declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub kind: RecordKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Annotation>,
    pub fields: Vec<Field>,
}

impl Record {
    /// Value of a `#[key = "value"]` attribute
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .and_then(|a| a.value.as_deref())
    }
}

/// `Name: Type [annotations];`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: TypeExpr,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl Field {
    /// First annotation with the given key
    pub fn annotation(&self, key: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.key == key)
    }

    /// Value of the annotation with the given key
    pub fn annotation_value(&self, key: &str) -> Option<&str> {
        self.annotation(key).and_then(|a| a.value.as_deref())
    }
}

/// `key` or `key = "value"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Annotation {
    pub fn new(key: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            key: key.into(),
            value: value.map(String::from),
        }
    }
}

/// Field type expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeExpr {
    /// `Foo` or `pkg.Foo`
    Named {
        qualifier: Option<String>,
        name: String,
    },
    /// `[]T`
    Array(Box<TypeExpr>),
    /// `*T`
    Pointer(Box<TypeExpr>),
    /// `map[K]V`
    Map(Box<TypeExpr>, Box<TypeExpr>),
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            qualifier: None,
            name: name.into(),
        }
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Named {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }

    /// Shape name for diagnostics, `None` for a plain named type
    pub fn container_shape(&self) -> Option<&'static str> {
        match self {
            Self::Named { .. } => None,
            Self::Array(_) => Some("array"),
            Self::Pointer(_) => Some("pointer"),
            Self::Map(..) => Some("map"),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { qualifier: Some(q), name } => write!(f, "{}.{}", q, name),
            Self::Named { qualifier: None, name } => write!(f, "{}", name),
            Self::Array(inner) => write!(f, "[]{}", inner),
            Self::Pointer(inner) => write!(f, "*{}", inner),
            Self::Map(k, v) => write!(f, "map[{}]{}", k, v),
        }
    }
}

// =============================================================================
// Query specs
// =============================================================================

/// `queryspec Name { query "..." { .. } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpecDecl {
    pub name: String,
    pub queries: Vec<QueryDecl>,
}

/// One custom query inside a query spec
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDecl {
    pub name: String,
    pub domain: Option<String>,
    pub port: Option<u16>,
    /// Name of a `type` in the same package describing the arguments
    pub args: Option<String>,
    /// `graphql` or `metrics`
    pub api: Option<String>,
}
