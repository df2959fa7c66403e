//! Toolsmith CLI
//!
//! Generate query tool specifications from sampled documents and manage the
//! local tool catalog.
//!
//! # Commands
//!
//! - `attributes`: list the attribute paths found in a collection or table
//! - `generate`: generate a tool specification, optionally saving it
//! - `list`: list catalog entries of a type
//! - `show`: print one catalog entry
//! - `import`: load a JSON file of tools into the catalog
//!
//! JSON goes to stdout; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use toolsmith_gen::{
    DirectorySampleProvider, FileCatalog, GenerationRequest, OpenAiGenerator, ToolCatalog,
    ToolGenerator, ToolsmithConfig,
};
use toolsmith_spec::{TOOL_TYPE, ToolTarget};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Query tool generator
#[derive(Debug, Parser)]
#[command(name = "toolsmith")]
#[command(about = "Generate query tool specifications from sampled documents")]
#[command(propagate_version = true, version)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the attribute paths found in a sample of documents
    Attributes {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Generate a tool specification for a collection or table
    Generate {
        #[command(flatten)]
        target: TargetArgs,

        /// Extra instructions for the generator
        #[arg(long)]
        instructions: Option<String>,

        /// Save the generated tool into the catalog
        #[arg(long)]
        save: bool,

        #[command(flatten)]
        tuning: GenerationArgs,
    },
    /// List catalog entries
    List {
        /// Entry type to list
        #[arg(long = "type", default_value = TOOL_TYPE)]
        tool_type: String,
    },
    /// Print one catalog entry
    Show {
        /// Catalog identifier
        id: String,
    },
    /// Import one tool or an array of tools, replacing stored tools by name
    Import {
        /// JSON file to import
        file: PathBuf,
    },
}

/// Overrides for a single generation.
#[derive(Debug, Args)]
struct GenerationArgs {
    /// Chat model to use
    #[arg(long)]
    model: Option<String>,

    /// Documents to sample
    #[arg(long)]
    sample_limit: Option<usize>,

    /// Sampled documents shown to the model
    #[arg(long)]
    prompt_samples: Option<usize>,
}

impl GenerationArgs {
    fn apply(self, mut config: ToolsmithConfig) -> ToolsmithConfig {
        if let Some(model) = self.model {
            config.openai = config.openai.with_model(model);
        }
        if let Some(limit) = self.sample_limit {
            config.generator = config.generator.with_sample_limit(limit);
        }
        if let Some(count) = self.prompt_samples {
            config.generator = config.generator.with_prompt_samples(count);
        }
        config
    }
}

/// The collection or table to sample.
#[derive(Debug, Args)]
struct TargetArgs {
    /// Collection name
    #[arg(long, conflicts_with = "table", required_unless_present = "table")]
    collection: Option<String>,

    /// Table name
    #[arg(long)]
    table: Option<String>,

    /// Database name
    #[arg(long = "db")]
    db_name: Option<String>,
}

impl TargetArgs {
    fn target(&self) -> anyhow::Result<ToolTarget> {
        match (&self.collection, &self.table) {
            (Some(name), None) => Ok(ToolTarget::collection(name.as_str())),
            (None, Some(name)) => Ok(ToolTarget::table(name.as_str())),
            _ => bail!("exactly one of --collection or --table is required"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "toolsmith=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ToolsmithConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ToolsmithConfig::default().with_env(),
    };

    match cli.command {
        Commands::Attributes { target } => {
            let report = generator(&config)
                .lookup_attributes(&target.target()?, target.db_name.as_deref())
                .await?;
            print_json(&report)?;
        }
        Commands::Generate {
            target,
            instructions,
            save,
            tuning,
        } => {
            let config = tuning.apply(config);
            let mut request = GenerationRequest::new(target.target()?);
            if let Some(db_name) = target.db_name {
                request = request.with_db_name(db_name);
            }
            if let Some(instructions) = instructions {
                request = request.with_instructions(instructions);
            }

            let result = generator(&config).generate(request).await?;
            let tool = if save {
                catalog(&config).await?.upsert(result.tool).await?
            } else {
                result.tool
            };
            print_json(&tool)?;
        }
        Commands::List { tool_type } => {
            let tools = catalog(&config).await?.list_by_type(&tool_type).await?;
            print_json(&tools)?;
        }
        Commands::Show { id } => {
            let tool = catalog(&config).await?.get(&id).await?;
            print_json(&tool)?;
        }
        Commands::Import { file } => {
            let tools = catalog(&config)
                .await?
                .import_file(&file)
                .await
                .with_context(|| format!("importing {}", file.display()))?;
            print_json(&serde_json::json!({"imported": tools.len(), "tools": tools}))?;
        }
    }

    Ok(())
}

fn generator(config: &ToolsmithConfig) -> ToolGenerator {
    let text_generator = OpenAiGenerator::new(config.openai.clone());
    if !text_generator.is_available() {
        tracing::warn!("OPENAI_API_KEY is not set; generation requests will fail");
    }

    ToolGenerator::new(
        Arc::new(DirectorySampleProvider::new(&config.samples_dir)),
        Arc::new(text_generator),
    )
    .with_config(config.generator.clone())
}

async fn catalog(config: &ToolsmithConfig) -> anyhow::Result<FileCatalog> {
    FileCatalog::new(&config.catalog_dir)
        .await
        .with_context(|| format!("opening catalog at {}", config.catalog_dir.display()))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_generate_arguments() {
        let cli = Cli::try_parse_from([
            "toolsmith",
            "generate",
            "--table",
            "books",
            "--db",
            "library",
            "--save",
        ])
        .unwrap();

        let Commands::Generate { target, save, .. } = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(target.target().unwrap(), ToolTarget::table("books"));
        assert_eq!(target.db_name.as_deref(), Some("library"));
        assert!(save);
    }

    #[test]
    fn test_generation_overrides() {
        let cli = Cli::try_parse_from([
            "toolsmith",
            "generate",
            "--collection",
            "movies",
            "--model",
            "gpt-4o",
            "--sample-limit",
            "20",
            "--prompt-samples",
            "3",
        ])
        .unwrap();

        let Commands::Generate { tuning, .. } = cli.command else {
            panic!("expected generate");
        };
        let config = tuning.apply(ToolsmithConfig::default());
        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.generator.sample_limit, 20);
        assert_eq!(config.generator.prompt_samples, 3);
    }

    #[test]
    fn test_import_arguments() {
        let cli = Cli::try_parse_from(["toolsmith", "import", "tools.json"]).unwrap();
        assert!(
            matches!(cli.command, Commands::Import { file } if file == PathBuf::from("tools.json"))
        );
    }

    #[test]
    fn test_target_is_required_and_exclusive() {
        assert!(Cli::try_parse_from(["toolsmith", "attributes"]).is_err());
        assert!(
            Cli::try_parse_from([
                "toolsmith",
                "attributes",
                "--collection",
                "a",
                "--table",
                "b"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_list_defaults_to_tools() {
        let cli = Cli::try_parse_from(["toolsmith", "list", "--config", "t.toml"]).unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("t.toml")));
        assert!(matches!(cli.command, Commands::List { tool_type } if tool_type == "tool"));
    }
}
