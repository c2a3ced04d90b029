//! Datamodel Compiler CLI
//!
//! Compiles a datamodel directory into a parent index, computes hashed
//! object names against a stored index, and renders the resource hierarchy.
//!
//! Usage:
//!   nexus-compile index ./datamodel -o parents.json
//!   nexus-compile hash --index parents.json --resource configs.config.tsm.example.com \
//!       --name configObj --label roots.root.tsm.example.com=default
//!   nexus-compile graph ./datamodel -o datamodel.dot

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use nexus_compiler::{hashing, Compiler, CompilerConfig, ParentIndex};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nexus-compile")]
#[command(about = "Compile nexus datamodels into a resource hierarchy")]
struct Cli {
    /// Configuration file layered over the default locations
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a datamodel and write its parent index as JSON
    Index {
        /// Datamodel root directory
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compute the hashed name of an object
    Hash {
        /// Parent index JSON written by `index`
        #[arg(short, long)]
        index: PathBuf,
        /// Resource id of the object
        #[arg(short, long)]
        resource: String,
        /// Display name of the object
        #[arg(short, long)]
        name: String,
        /// Ancestor instance name as `resourceId=label`, repeatable
        #[arg(short, long = "label", value_parser = parse_label)]
        labels: Vec<(String, String)>,
    },

    /// Render the resource hierarchy in DOT format
    Graph {
        /// Datamodel root directory
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

fn parse_label(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(id, label)| (id.to_string(), label.to_string()))
        .ok_or_else(|| format!("expected resourceId=label, got '{}'", s))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CompilerConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Index { dir, output } => {
            let format = config.output.format;
            let compilation = Compiler::new(config).compile(&dir)?;
            let json = compilation.index.to_json(format)?;
            emit(output.as_ref(), &json)?;
            eprintln!(
                "{} resources, roots {:?}, fingerprint {}",
                compilation.index.len(),
                compilation.graph.roots(),
                compilation.fingerprint
            );
            if let Some(module_path) = &compilation.output_module_path {
                eprintln!("generated module path {}", module_path);
            }
        }

        Commands::Hash {
            index,
            resource,
            name,
            labels,
        } => {
            let parents = ParentIndex::load(&index)
                .with_context(|| format!("reading parent index {}", index.display()))?;
            if parents.get(&resource).is_none() {
                return Err(anyhow!("unknown resource id {}", resource));
            }
            let labels: HashMap<String, String> = labels.into_iter().collect();
            println!("{}", hashing::object_name(&parents, &resource, &labels, &name));
        }

        Commands::Graph { dir, output } => {
            let compilation = Compiler::new(config).compile(&dir)?;
            emit(output.as_ref(), &compilation.graph.to_dot())?;
        }

        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn emit(output: Option<&PathBuf>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
