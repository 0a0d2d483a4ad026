use anyhow::{bail, Context};
use colored::Colorize;
use depot_project::{DepotConfig, ProjectManager};
use depot_storage::ShutdownCause;
use depot_types::{Author, CreationTime};
use tokio::runtime::Runtime;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    debug!(root = %config.root_dir.display(), cache_spec = ?config.cache_spec(), workers = config.worker_threads, "configuration resolved");
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads.max(1))
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    let manager = ProjectManager::from_config(&config, runtime.handle().clone())
        .with_context(|| format!("failed to open {}", config.root_dir.display()))?;
    let result = dispatch(&cli, &manager);
    manager.close(&|| ShutdownCause::new("depot command finished"));
    shutdown(runtime);
    result
}

/// Config file first, then command-line overrides.
fn resolve_config(cli: &Cli) -> anyhow::Result<DepotConfig> {
    let mut config = match &cli.config {
        Some(path) => DepotConfig::load(path)?,
        None => DepotConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.root_dir = root.clone();
    }
    if let Some(spec) = &cli.cache_spec {
        config.cache_spec = Some(spec.clone());
    }
    Ok(config)
}

fn shutdown(runtime: Runtime) {
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
}

fn dispatch(cli: &Cli, manager: &ProjectManager) -> anyhow::Result<()> {
    let json = matches!(cli.format, OutputFormat::Json);
    match &cli.command {
        Command::Create(args) => cmd_create(manager, args),
        Command::Get(args) => cmd_get(manager, &args.project, json),
        Command::Exists(args) => cmd_exists(manager, &args.project, json),
        Command::List => cmd_list(manager, json),
        Command::Stats => cmd_stats(manager, json),
        Command::Repo(args) => match &args.action {
            RepoAction::Create { project, repo, author } => {
                cmd_repo_create(manager, project, repo, author)
            }
            RepoAction::List { project } => cmd_repo_list(manager, project, json),
        },
    }
}

fn author_from(args: &AuthorArgs) -> anyhow::Result<Author> {
    Ok(match (&args.author_name, &args.author_email) {
        (Some(name), Some(email)) => Author::new(name, email)?,
        (None, Some(email)) => Author::from_email(email)?,
        (None, None) => Author::system(),
        (Some(_), None) => bail!("--author-name requires --author-email"),
    })
}

fn cmd_create(manager: &ProjectManager, args: &CreateArgs) -> anyhow::Result<()> {
    let author = author_from(&args.author)?;
    let project = manager.create_now(&args.project, &author)?;
    println!("{} Created project {}", "✓".green().bold(), project.name().yellow());
    println!("  Author: {}", author);
    println!("  Path: {}", project.dir().display());
    Ok(())
}

fn cmd_get(manager: &ProjectManager, name: &str, json: bool) -> anyhow::Result<()> {
    let project = manager.get(name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(project.metadata())?);
        return Ok(());
    }
    println!("Project {}", project.name().yellow().bold());
    println!("  Author: {}", project.author());
    println!("  Created: {}", project.creation_time());
    println!("  Repositories: {}", project.repos().list()?.len());
    Ok(())
}

fn cmd_exists(manager: &ProjectManager, name: &str, json: bool) -> anyhow::Result<()> {
    let exists = manager.exists(name)?;
    if json {
        println!("{}", serde_json::json!({ "name": name, "exists": exists }));
    } else if exists {
        println!("{} {} exists", "✓".green(), name.yellow());
    } else {
        println!("{} {} does not exist", "✗".red(), name.yellow());
    }
    Ok(())
}

fn cmd_list(manager: &ProjectManager, json: bool) -> anyhow::Result<()> {
    print_names(&manager.list()?, "No projects.", json)
}

fn cmd_stats(manager: &ProjectManager, json: bool) -> anyhow::Result<()> {
    let stats = manager.cache_stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    println!("Cache statistics");
    println!("  Requests: {}", stats.request_count().to_string().bold());
    println!("  Hits: {} ({:.1}%)", stats.hit_count, stats.hit_rate() * 100.0);
    println!("  Misses: {}", stats.miss_count);
    println!("  Loads: {} ok, {} failed", stats.load_success_count, stats.load_failure_count);
    println!("  Evictions: {} ({} bytes)", stats.eviction_count, stats.eviction_weight);
    Ok(())
}

fn cmd_repo_create(
    manager: &ProjectManager,
    project: &str,
    repo: &str,
    author: &AuthorArgs,
) -> anyhow::Result<()> {
    let author = author_from(author)?;
    let project = manager.get(project)?;
    let repo = project.repos().create(repo, &author, CreationTime::now())?;
    println!(
        "{} Created repository {}/{}",
        "✓".green().bold(),
        project.name().yellow(),
        repo.name().cyan()
    );
    Ok(())
}

fn cmd_repo_list(manager: &ProjectManager, project: &str, json: bool) -> anyhow::Result<()> {
    let project = manager.get(project)?;
    print_names(&project.repos().list()?, "No repositories.", json)
}

fn print_names(names: &[String], empty: &str, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(names)?);
    } else if names.is_empty() {
        println!("{}", empty.dimmed());
    } else {
        for name in names {
            println!("  {}", name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("depot").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn overrides_win_over_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depot.toml");
        std::fs::write(&path, "root_dir = \"/from/file\"\nworker_threads = 2\n").unwrap();

        let cli = parse(&[
            "--config",
            path.to_str().unwrap(),
            "--cache-spec",
            "",
            "list",
        ]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.root_dir, std::path::PathBuf::from("/from/file"));
        assert_eq!(config.worker_threads, 2);
        assert_eq!(config.cache_spec(), None);

        let cli = parse(&["--config", path.to_str().unwrap(), "--root", "/cli", "list"]);
        assert_eq!(resolve_config(&cli).unwrap().root_dir, std::path::PathBuf::from("/cli"));
    }

    #[test]
    fn author_resolution() {
        let none = AuthorArgs { author_name: None, author_email: None };
        assert_eq!(author_from(&none).unwrap(), Author::system());

        let email = AuthorArgs { author_name: None, author_email: Some("x@y.z".into()) };
        assert_eq!(author_from(&email).unwrap().email(), "x@y.z");

        let name_only = AuthorArgs { author_name: Some("X".into()), author_email: None };
        assert!(author_from(&name_only).is_err());
    }

    #[test]
    fn commands_run_against_a_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();

        run_command(parse(&["--root", root, "create", "alpha"])).unwrap();
        run_command(parse(&["--root", root, "repo", "create", "alpha", "docs"])).unwrap();
        run_command(parse(&["--root", root, "--format", "json", "get", "alpha"])).unwrap();
        run_command(parse(&["--root", root, "stats"])).unwrap();
        assert!(dir.path().join("alpha/repos/docs/content").is_dir());

        assert!(run_command(parse(&["--root", root, "create", "alpha"])).is_err());
        assert!(run_command(parse(&["--root", root, "get", "ghost"])).is_err());
    }
}
