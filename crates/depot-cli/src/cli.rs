use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "depot", about = "Depot: directory-backed project storage", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage root, overriding the configuration
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Cache spec, overriding the configuration; "" disables caching
    #[arg(long, global = true)]
    pub cache_spec: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a project
    Create(CreateArgs),
    /// Show a project's creation metadata
    Get(NameArgs),
    /// Check whether a project exists
    Exists(NameArgs),
    /// List projects
    List,
    /// Show repository cache statistics
    Stats,
    /// Manage a project's repositories
    Repo(RepoArgs),
}

#[derive(Args)]
pub struct AuthorArgs {
    #[arg(long)]
    pub author_name: Option<String>,
    #[arg(long)]
    pub author_email: Option<String>,
}

#[derive(Args)]
pub struct CreateArgs {
    pub project: String,
    #[command(flatten)]
    pub author: AuthorArgs,
}

#[derive(Args)]
pub struct NameArgs {
    pub project: String,
}

#[derive(Args)]
pub struct RepoArgs {
    #[command(subcommand)]
    pub action: RepoAction,
}

#[derive(Subcommand)]
pub enum RepoAction {
    /// Create a repository in a project
    Create {
        project: String,
        repo: String,
        #[command(flatten)]
        author: AuthorArgs,
    },
    /// List a project's repositories
    List { project: String },
}
