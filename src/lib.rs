//! Nexus Datamodel Compiler
//!
//! Compiles a tree of `.nexus` declaration files into a rooted resource
//! hierarchy and flattens it into a [`ParentIndex`] for code generators.
//!
//! ## Pipeline
//!
//! ```text
//! datamodel/                 Loader         GraphBuilder        ParentResolver
//! ├── nexus.mod.toml   ──▶  packages  ──▶  ResourceGraph  ──▶   ParentIndex
//! ├── root.nexus                            (one position        (resourceId ->
//! └── config/                                per resource)        descriptor)
//!     └── config.nexus
//! ```
//!
//! ## Features
//!
//! - **Single position**: every resource type has exactly one ancestor chain;
//!   cycles and multiply-owned types are rejected
//! - **Root repair**: types declared next to the root but owned by it are not
//!   treated as extra roots
//! - **Hashed names**: [`hashing::hashed_name`] derives content-addressed object
//!   names from a resource and its ancestors' instance names
//! - **Fingerprints**: SHA256 over the canonical index JSON

pub mod checksum;
pub mod compiler;
pub mod config;
pub mod dsl;
pub mod error;
pub mod graph;
pub mod hashing;
pub mod loader;
pub mod names;
pub mod parents;
pub mod query;

pub use checksum::Fingerprint;
pub use compiler::{Compilation, Compiler};
pub use config::{CompilerConfig, OutputFormat};
pub use error::{CompilerError, Result};
pub use graph::{GraphBuilder, ResourceGraph, ResourceId, ResourceNode};
pub use hashing::{hashed_name, ordered_ancestor_labels, AncestorLabels};
pub use loader::{Datamodel, Loader, Package};
pub use parents::{EdgeDescriptor, LinkDescriptor, NodeDescriptor, ParentIndex, ParentResolver};
pub use query::{ApiType, QuerySpec};
