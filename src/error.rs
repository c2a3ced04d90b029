//! Error types for the datamodel compiler

use std::path::PathBuf;

use thiserror::Error;

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, CompilerError>;

/// Datamodel compiler errors
///
/// Every variant is fatal for the current compilation. Messages name the
/// offending package, type or field so the datamodel author can act on them.
#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("Invalid package name <{name}> in {dir}: package name is already defined in {existing}. Package names must be unique")]
    DuplicatePackageName {
        name: String,
        dir: PathBuf,
        existing: PathBuf,
    },

    #[error("Invalid package name <{name}> in {dir}: only lowercase alphanumeric characters are allowed")]
    InvalidPackageName { name: String, dir: PathBuf },

    #[error("Directory {dir} mixes packages <{first}> and <{second}>")]
    MixedPackages {
        dir: PathBuf,
        first: String,
        second: String,
    },

    #[error("Name {name} is reserved, please rename {context}")]
    ReservedNameUsed { name: String, context: String },

    #[error("Invalid type {ty} for field {field} in node {node}: a child or link can not be {shape}. Use nexus = \"children\" or \"links\" for named children or links")]
    InvalidFieldShape {
        node: String,
        field: String,
        ty: String,
        shape: &'static str,
    },

    #[error("Singleton node {target} can't be used as a named child or link, wrong field {field} in node {node}")]
    SingletonCannotBeNamed {
        node: String,
        field: String,
        target: String,
    },

    #[error("Node {node} has more than one status field: {fields:?}")]
    MultipleStatusFields { node: String, fields: Vec<String> },

    #[error("Types {first} and {second} both map to resource id {resource_id}")]
    DuplicateResourceId {
        resource_id: String,
        first: String,
        second: String,
    },

    #[error("Internal compiler failure: failed to determine resource id of {0}")]
    UnresolvedCrdName(String),

    #[error("Failed to resolve type {ty} of field {field} in node {node}{}", suggestion_suffix(.suggestion))]
    UnresolvedFieldType {
        node: String,
        field: String,
        ty: String,
        suggestion: Option<String>,
    },

    #[error("Node {node} is reachable from {first:?} and {second:?}; a node can only have one position in the graph")]
    MultiplePositionsForNode {
        node: String,
        first: Vec<String>,
        second: Vec<String>,
    },

    #[error("Cyclic graph: {}", .cycle.join(" -> "))]
    CyclicGraph { cycle: Vec<String> },

    #[error("Unknown query spec {spec} referenced by node {node}")]
    UnknownQuerySpec { node: String, spec: String },

    #[error("Failed to read module manifest {path}: {message}")]
    ModuleManifest { path: PathBuf, message: String },

    #[error("Failed to parse {path}:\n{message}")]
    Parse { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean {}?)", s),
        None => String::new(),
    }
}

impl CompilerError {
    /// True for failures caused by a compiler bug rather than by the input
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::UnresolvedCrdName(_))
    }
}
