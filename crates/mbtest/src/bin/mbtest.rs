//! mbtest CLI
//!
//! Inspect a running Mountebank server and load imposter files into it.
//!
//! Usage:
//!   mbtest [--host HOST] [--port PORT] <version|list|deploy FILE...|clear>

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use mbtest::config::{DEFAULT_HOST, DEFAULT_PORT, ENV_HOST, ENV_PORT};
use mbtest::imposters::Imposter;
use mbtest::MountebankServer;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Mountebank test client
#[derive(Parser, Debug)]
#[command(name = "mbtest")]
#[command(author, version, about = "Inspect a Mountebank server and load imposters into it")]
struct Args {
    /// Mountebank host
    #[arg(long, env = ENV_HOST, default_value = DEFAULT_HOST)]
    host: String,

    /// Mountebank admin port
    #[arg(short, long, env = ENV_PORT, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the server version
    Version,
    /// List imposters on the server
    List,
    /// Create imposters from JSON files (a single imposter or `{"imposters": [...]}`)
    Deploy {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Delete every imposter on the server
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "mbtest=debug" } else { "mbtest=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let server = MountebankServer::existing(args.host.clone(), args.port)?;

    match args.command {
        Command::Version => {
            let version = server
                .version()
                .await
                .with_context(|| format!("querying {}", server.admin().base_url()))?;
            println!("{version}");
        }
        Command::List => {
            let imposters = server.query_all_imposters().await?;
            if imposters.is_empty() {
                println!("{DIM}No imposters{RESET}");
            }
            for imposter in imposters {
                let url = imposter.url().map(|u| u.to_string()).unwrap_or_default();
                println!(
                    "{BOLD}{}{RESET}  {CYAN}{url}{RESET}  {DIM}{} stub(s){RESET}",
                    imposter.name.as_deref().unwrap_or("(unnamed)"),
                    imposter.stubs.len()
                );
            }
        }
        Command::Deploy { files } => {
            for file in &files {
                for mut imposter in load_imposters(file)? {
                    server
                        .add_imposter(&mut imposter)
                        .await
                        .with_context(|| format!("deploying {}", file.display()))?;
                    println!("{GREEN}✓{RESET} {} → {CYAN}{}{RESET}", file.display(), imposter.url()?);
                }
            }
        }
        Command::Clear => {
            server.delete_all_imposters().await?;
            println!("{GREEN}✓{RESET} All imposters deleted");
        }
    }

    Ok(())
}

fn load_imposters(path: &Path) -> anyhow::Result<Vec<Imposter>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;

    let structures = match value {
        serde_json::Value::Object(mut obj) if obj.contains_key("imposters") => {
            match obj.remove("imposters") {
                Some(serde_json::Value::Array(items)) => items,
                _ => bail!("{}: \"imposters\" must be an array", path.display()),
            }
        }
        serde_json::Value::Object(_) => vec![value],
        _ => bail!("{}: expected an imposter object", path.display()),
    };

    structures
        .into_iter()
        .map(|s| {
            Imposter::from_structure(s).with_context(|| format!("invalid imposter in {}", path.display()))
        })
        .collect()
}
