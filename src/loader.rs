//! Datamodel Loading
//!
//! Walks a datamodel directory, parses every `.nexus` file and groups the
//! declarations into packages. One directory holds exactly one package, and a
//! package name may only be used once per datamodel.
//!
//! No type references are resolved here; that is the graph builder's job.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::CompilerConfig;
use crate::dsl::{self, Import, Item, QuerySpecDecl, Record};
use crate::error::{CompilerError, Result};
use crate::graph::validate;
use crate::names;

/// File extension of declaration files
pub const DSL_EXTENSION: &str = "nexus";

/// Contents of the module manifest at the datamodel root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Module path every package import path is rooted at
    pub module: String,
}

/// One parsed file of a package; imports are file-scoped
#[derive(Debug, Clone)]
pub struct PackageFile {
    pub path: PathBuf,
    pub imports: Vec<Import>,
    pub records: Vec<Record>,
}

/// All declarations found in one directory
#[derive(Debug, Clone)]
pub struct Package {
    /// Declared package name
    pub name: String,
    /// Module path plus root-relative directory
    pub import_path: String,
    /// Directory relative to the datamodel root (empty for the root itself)
    pub dir: PathBuf,
    pub files: Vec<PackageFile>,
    pub query_specs: Vec<QuerySpecDecl>,
}

impl Package {
    /// True if the package sits directly in the datamodel root
    pub fn is_root(&self) -> bool {
        self.dir.as_os_str().is_empty()
    }

    /// Every record with the imports of the file declaring it
    pub fn records(&self) -> impl Iterator<Item = (&Record, &[Import])> + '_ {
        self.files
            .iter()
            .flat_map(|f| f.records.iter().map(move |r| (r, f.imports.as_slice())))
    }

    pub fn record(&self, name: &str) -> Option<&Record> {
        self.records().map(|(r, _)| r).find(|r| r.name == name)
    }
}

/// A loaded datamodel
#[derive(Debug, Clone)]
pub struct Datamodel {
    pub module_path: String,
    /// Packages ordered by import path
    pub packages: Vec<Package>,
}

impl Datamodel {
    pub fn package_by_import_path(&self, import_path: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.import_path == import_path)
    }

    /// Number of node declarations across all packages
    pub fn node_count(&self) -> usize {
        self.packages
            .iter()
            .flat_map(|p| p.records())
            .filter(|(r, _)| r.kind.is_node())
            .count()
    }
}

/// Parsed but not yet grouped source file
struct RawFile {
    dir: PathBuf,
    path: PathBuf,
    file: dsl::SourceFile,
}

/// Loads datamodels according to a compiler configuration
pub struct Loader<'a> {
    config: &'a CompilerConfig,
}

impl<'a> Loader<'a> {
    pub fn new(config: &'a CompilerConfig) -> Self {
        Self { config }
    }

    /// Read the module manifest at `root`
    pub fn read_manifest(&self, root: &Path) -> Result<ModuleManifest> {
        let path = self.config.manifest_path(root);
        let content = fs::read_to_string(&path).map_err(|e| CompilerError::ModuleManifest {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let manifest: ModuleManifest =
            toml::from_str(&content).map_err(|e| CompilerError::ModuleManifest {
                path: path.clone(),
                message: e.to_string(),
            })?;
        if manifest.module.trim().is_empty() {
            return Err(CompilerError::ModuleManifest {
                path,
                message: "module path is empty".to_string(),
            });
        }
        Ok(manifest)
    }

    /// Load every package under `root`
    pub fn load(&self, root: &Path) -> Result<Datamodel> {
        let manifest = self.read_manifest(root)?;
        let mut raw = Vec::new();

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                if self.config.is_ignored_dir(&name) {
                    info!("Ignoring {} directory", name);
                    return false;
                }
                true
            });

        for entry in walker {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if path.extension().map(|e| e != DSL_EXTENSION).unwrap_or(true) {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            let dir = relative.parent().map(Path::to_path_buf).unwrap_or_default();
            let content = fs::read_to_string(path)?;
            let file = dsl::parse_file(&content).map_err(|message| CompilerError::Parse {
                path: relative.clone(),
                message,
            })?;
            debug!(file = %relative.display(), package = %file.package, "parsed declaration file");
            raw.push(RawFile {
                dir,
                path: relative,
                file,
            });
        }

        self.assemble(&manifest.module, raw)
    }

    /// Load from in-memory sources given as `(directory, file name, source)`
    pub fn load_sources(&self, module_path: &str, sources: &[(&str, &str, &str)]) -> Result<Datamodel> {
        let mut raw = Vec::with_capacity(sources.len());
        for (dir, name, src) in sources {
            let dir = PathBuf::from(dir);
            let path = dir.join(name);
            let file = dsl::parse_file(src).map_err(|message| CompilerError::Parse {
                path: path.clone(),
                message,
            })?;
            raw.push(RawFile { dir, path, file });
        }
        self.assemble(module_path, raw)
    }

    fn assemble(&self, module_path: &str, raw: Vec<RawFile>) -> Result<Datamodel> {
        let module_path = module_path.trim_end_matches('/');

        let mut by_dir: BTreeMap<PathBuf, Vec<RawFile>> = BTreeMap::new();
        for file in raw {
            by_dir.entry(file.dir.clone()).or_default().push(file);
        }

        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        let mut packages = Vec::with_capacity(by_dir.len());

        for (dir, mut files) in by_dir {
            files.sort_by(|a, b| a.path.cmp(&b.path));
            let name = files[0].file.package.clone();

            if let Some(other) = files.iter().find(|f| f.file.package != name) {
                return Err(CompilerError::MixedPackages {
                    dir,
                    first: name,
                    second: other.file.package.clone(),
                });
            }
            if names::has_special_chars(&name) {
                return Err(CompilerError::InvalidPackageName { name, dir });
            }
            if let Some(existing) = seen.get(&name) {
                return Err(CompilerError::DuplicatePackageName {
                    name,
                    dir,
                    existing: existing.clone(),
                });
            }
            seen.insert(name.clone(), dir.clone());

            let import_path = import_path(module_path, &dir);
            let mut package = Package {
                name,
                import_path,
                dir,
                files: Vec::with_capacity(files.len()),
                query_specs: Vec::new(),
            };

            for raw in files {
                let mut records = Vec::new();
                for item in raw.file.items {
                    match item {
                        Item::Record(record) => {
                            validate::check_type_name(&package.name, &record.name)?;
                            records.push(record);
                        }
                        Item::QuerySpec(spec) => package.query_specs.push(spec),
                    }
                }
                package.files.push(PackageFile {
                    path: raw.path,
                    imports: raw.file.imports,
                    records,
                });
            }

            info!(
                package = %package.name,
                import_path = %package.import_path,
                files = package.files.len(),
                "loaded package"
            );
            packages.push(package);
        }

        packages.sort_by(|a, b| a.import_path.cmp(&b.import_path));
        Ok(Datamodel {
            module_path: module_path.to_string(),
            packages,
        })
    }
}

/// `module/path/rel/dir`, or just the module path for the root
fn import_path(module_path: &str, dir: &Path) -> String {
    let segments: Vec<String> = dir
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if segments.is_empty() {
        module_path.to_string()
    } else {
        format!("{}/{}", module_path, segments.join("/"))
    }
}
