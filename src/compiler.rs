//! Compilation pipeline
//!
//! Load, build, resolve. Each stage consumes the previous stage's output and
//! the first error aborts the whole compilation; there is no partial result.

use std::path::Path;
use tracing::{info, instrument};

use crate::checksum::Fingerprint;
use crate::config::CompilerConfig;
use crate::error::Result;
use crate::graph::{GraphBuilder, ResourceGraph};
use crate::loader::{Datamodel, Loader};
use crate::parents::{ParentIndex, ParentResolver};

/// Output of one compilation
#[derive(Debug, Clone)]
pub struct Compilation {
    /// Module path read from the datamodel manifest
    pub module_path: String,
    /// Module path of generated code, from `output.module_path`
    pub output_module_path: Option<String>,
    pub graph: ResourceGraph,
    pub index: ParentIndex,
    pub fingerprint: Fingerprint,
}

/// Compiles datamodels with a fixed configuration
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile the datamodel rooted at `root`
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn compile(&self, root: &Path) -> Result<Compilation> {
        let model = Loader::new(&self.config).load(root)?;
        self.compile_model(model)
    }

    /// Compile in-memory sources given as `(directory, file name, source)`
    pub fn compile_sources(&self, module_path: &str, sources: &[(&str, &str, &str)]) -> Result<Compilation> {
        let model = Loader::new(&self.config).load_sources(module_path, sources)?;
        self.compile_model(model)
    }

    fn compile_model(&self, model: Datamodel) -> Result<Compilation> {
        let graph = GraphBuilder::new(&self.config).build(&model)?;
        let index = ParentResolver::new().resolve(&graph)?;
        let fingerprint = index.fingerprint()?;

        info!(
            packages = model.packages.len(),
            resources = index.len(),
            fingerprint = %fingerprint,
            "compiled datamodel"
        );

        let output_module_path = self
            .config
            .output
            .module_path
            .as_deref()
            .map(|path| path.trim_end_matches('/').to_string())
            .filter(|path| !path.is_empty());

        Ok(Compilation {
            module_path: model.module_path,
            output_module_path,
            graph,
            index,
            fingerprint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_sources() {
        let compiler = Compiler::new(CompilerConfig::with_base_domain("x.com"));
        let out = compiler
            .compile_sources(
                "x.com/dm",
                &[(
                    "",
                    "root.nexus",
                    r#"package root; node Root { Config: Config [nexus = "child"]; } node Config {}"#,
                )],
            )
            .unwrap();

        assert_eq!(out.module_path, "x.com/dm");
        assert!(out.output_module_path.is_none());
        assert_eq!(out.index.len(), 2);
        assert_eq!(
            out.index.parents("configs.root.x.com").unwrap(),
            &["roots.root.x.com".to_string()]
        );
        assert_eq!(out.fingerprint, out.index.fingerprint().unwrap());
    }

    #[test]
    fn test_output_module_path_from_config() {
        let mut config = CompilerConfig::with_base_domain("x.com");
        config.output.module_path = Some("example.com/generated/".to_string());
        let out = Compiler::new(config)
            .compile_sources("x.com/dm", &[("", "root.nexus", "package root; node Root {}")])
            .unwrap();

        assert_eq!(out.module_path, "x.com/dm");
        assert_eq!(out.output_module_path.as_deref(), Some("example.com/generated"));
    }
}
