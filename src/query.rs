//! Custom GraphQL query specs
//!
//! A package can declare `queryspec` blocks; a node opts in with
//! `#[query = "pkg.SpecName"]`. Specs are resolved once per compilation and
//! copied onto the nodes that reference them, so generators never need to
//! look at declarations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::dsl::{QueryDecl, Record, ALIAS_NAME_KEY, ALIAS_TYPE_KEY};
use crate::error::{CompilerError, Result};
use crate::loader::{Datamodel, Package};

/// Node attribute naming the attached query spec
pub const QUERY_ATTRIBUTE: &str = "query";

/// Backend API a query is served by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApiType {
    #[default]
    GraphQlQuery,
    GetMetrics,
}

impl ApiType {
    /// `graphql` or `metrics`; anything else falls back to `graphql`
    fn from_keyword(spec: &str, query: &str, keyword: Option<&str>) -> Self {
        match keyword {
            None | Some("graphql") => Self::GraphQlQuery,
            Some("metrics") => Self::GetMetrics,
            Some(other) => {
                warn!(spec, query, api = other, "unknown api type, using graphql");
                Self::GraphQlQuery
            }
        }
    }
}

/// Network endpoint serving a query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub domain: String,
    pub port: u16,
}

/// One query argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryArg {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    /// Type was overridden with `nexus-alias-type`
    pub alias_type: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub name: String,
    pub service_endpoint: ServiceEndpoint,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<QueryArg>,
    pub api_type: ApiType,
}

/// A resolved, named collection of queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// `pkg.SpecName`
    pub name: String,
    pub queries: Vec<Query>,
}

/// Every query spec of a datamodel keyed by `pkg.SpecName`
#[derive(Debug, Clone, Default)]
pub struct QuerySpecs {
    specs: BTreeMap<String, QuerySpec>,
}

impl QuerySpecs {
    /// Resolve all query specs declared in the datamodel
    pub fn collect(model: &Datamodel) -> Self {
        let mut specs = BTreeMap::new();
        for package in &model.packages {
            for decl in &package.query_specs {
                let name = format!("{}.{}", package.name, decl.name);
                let queries = decl
                    .queries
                    .iter()
                    .map(|q| resolve_query(package, &name, q))
                    .collect();
                specs.insert(name.clone(), QuerySpec { name, queries });
            }
        }
        Self { specs }
    }

    pub fn get(&self, name: &str) -> Option<&QuerySpec> {
        self.specs.get(name)
    }

    /// Spec attached to a node, if the node has a `query` attribute
    ///
    /// An unqualified spec name refers to the node's own package.
    pub fn attached_to(&self, package: &str, record: &Record) -> Result<Option<QuerySpec>> {
        let Some(reference) = record.attribute(QUERY_ATTRIBUTE) else {
            return Ok(None);
        };
        let qualified = if reference.contains('.') {
            reference.to_string()
        } else {
            format!("{}.{}", package, reference)
        };
        match self.specs.get(&qualified) {
            Some(spec) => Ok(Some(spec.clone())),
            None => Err(CompilerError::UnknownQuerySpec {
                node: record.name.clone(),
                spec: reference.to_string(),
            }),
        }
    }
}

fn resolve_query(package: &Package, spec: &str, decl: &QueryDecl) -> Query {
    let args = match &decl.args {
        Some(type_name) => resolve_args(package, spec, type_name),
        None => Vec::new(),
    };
    Query {
        name: decl.name.clone(),
        service_endpoint: ServiceEndpoint {
            domain: decl.domain.clone().unwrap_or_default(),
            port: decl.port.unwrap_or_default(),
        },
        args,
        api_type: ApiType::from_keyword(spec, &decl.name, decl.api.as_deref()),
    }
}

/// Arguments come from the fields of a type in the query spec's package
fn resolve_args(package: &Package, spec: &str, type_name: &str) -> Vec<QueryArg> {
    let Some(record) = package.record(type_name) else {
        warn!(spec, args = type_name, package = %package.name, "query args type not found");
        return Vec::new();
    };
    record
        .fields
        .iter()
        .map(|field| {
            let name = field
                .annotation_value(ALIAS_NAME_KEY)
                .filter(|v| !v.is_empty())
                .unwrap_or(&field.name)
                .to_string();
            match field.annotation_value(ALIAS_TYPE_KEY).filter(|v| !v.is_empty()) {
                Some(alias) => QueryArg {
                    name,
                    ty: alias.to_string(),
                    alias_type: true,
                },
                None => QueryArg {
                    name,
                    ty: field.ty.to_string(),
                    alias_type: false,
                },
            }
        })
        .collect()
}
