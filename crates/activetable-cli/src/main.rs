//! activetable CLI
//!
//! Renders query specs written as JSON into dialect-specific SQL, prints
//! metadata statements, and decodes result rows by their positional aliases.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use activetable_sql::{Dialect, QueryRenderer, QuerySpec, RenderedQuery};

/// Multi-dialect SQL generation.
#[derive(Parser)]
#[command(name = "activetable")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Driver name: mysql, pgsql, mssql, oci8, oracle-quoted.
    #[arg(short, long, env = "ACTIVETABLE_DIALECT", default_value = "mysql")]
    dialect: Dialect,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a query spec to SQL and its bind list.
    Render {
        /// JSON query spec.
        #[arg(short, long)]
        spec: PathBuf,

        /// Print binds as escaped SQL literals instead of JSON.
        #[arg(long)]
        inline: bool,
    },

    /// Print the statement listing a table's columns.
    Describe {
        /// Table name.
        #[arg(short, long)]
        table: String,

        /// Database or schema.
        #[arg(short, long)]
        schema: Option<String>,
    },

    /// Print the statement fetching the last inserted key.
    LastInsertId {
        /// Table name.
        #[arg(short, long)]
        table: String,
    },

    /// Decode a result row (JSON object keyed by alias) for a query spec.
    Decode {
        /// JSON query spec the row was produced by.
        #[arg(short, long)]
        spec: PathBuf,

        /// JSON object mapping result column aliases to values.
        #[arg(short, long)]
        row: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let output = run(&cli)?;
    println!("{output}");

    Ok(())
}

fn run(cli: &Cli) -> anyhow::Result<String> {
    let renderer = QueryRenderer::new(cli.dialect);
    info!(dialect = %cli.dialect, "Using dialect");

    match &cli.command {
        Commands::Render { spec, inline } => {
            let rendered = render_file(&renderer, spec)?;
            Ok(format_rendered(&rendered, *inline))
        }

        Commands::Describe { table, schema } => {
            Ok(renderer.describe_table(table, schema.as_deref()))
        }

        Commands::LastInsertId { table } => renderer
            .last_insert_id(table)
            .with_context(|| format!("Cannot fetch the last insert id of '{table}'")),

        Commands::Decode { spec, row: row_path } => {
            let rendered = render_file(&renderer, spec)?;
            let text = fs::read_to_string(row_path)
                .with_context(|| format!("Failed to read row file {}", row_path.display()))?;
            let row: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&text)
                .with_context(|| format!("Row file {} is not a JSON object", row_path.display()))?;
            let decoded = rendered.aliases.decode_row(row)?;
            Ok(serde_json::to_string_pretty(&decoded)?)
        }
    }
}

fn load_spec(path: &Path) -> anyhow::Result<QuerySpec> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read spec file {}", path.display()))?;
    let spec = serde_json::from_str(&text)
        .with_context(|| format!("Invalid query spec in {}", path.display()))?;
    debug!(path = %path.display(), "Loaded query spec");
    Ok(spec)
}

fn render_file(renderer: &QueryRenderer, path: &Path) -> anyhow::Result<RenderedQuery> {
    let spec = load_spec(path)?;
    renderer
        .select(&spec)
        .with_context(|| format!("Cannot render {} for {}", path.display(), renderer.dialect()))
}

/// SQL text followed by one `-- ?N = value` line per bind.
fn format_rendered(rendered: &RenderedQuery, inline: bool) -> String {
    let mut out = rendered.sql.clone();
    for (i, value) in rendered.binds.iter().enumerate() {
        let shown = if inline {
            value.to_sql_inline()
        } else {
            serde_json::to_string(value).unwrap_or_else(|_| value.to_sql_inline())
        };
        out.push_str(&format!("\n-- ?{} = {shown}", i + 1));
    }
    out
}
