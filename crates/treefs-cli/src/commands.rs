use std::io::Write;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;
use treefs::{FileInfo, FileSystem, FileType, TreeFs, VfsFile};
use treefs_repo::{Repository, Signature};
use treefs_server::{ServerConfig, TreeFsServer};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Ls(args) => cmd_ls(args, cli.format),
        Command::Cat(args) => cmd_cat(args),
        Command::Stat(args) => cmd_stat(args, cli.format),
    }
}

/// Import `dir` into a fresh in-memory repository and commit it on HEAD.
fn snapshot(dir: &Path) -> anyhow::Result<Repository> {
    let repo = Repository::in_memory()?;
    let tree = repo
        .import_dir(dir)
        .with_context(|| format!("importing {}", dir.display()))?;
    let sig = Signature::now("treefs", "treefs@localhost");
    let commit = repo.commit(
        Some("HEAD"),
        &sig,
        &sig,
        &format!("Snapshot of {}\n", dir.display()),
        tree,
    )?;
    tracing::debug!(tree = %tree.short_hex(), commit = %commit.short_hex(), "snapshot committed");
    Ok(repo)
}

/// Open the repository a command reads from.
fn open(source: &SourceArgs) -> anyhow::Result<Repository> {
    match (&source.location.repo, &source.location.dir) {
        (Some(path), _) => Repository::open_git(path)
            .with_context(|| format!("opening git repository {}", path.display())),
        (None, Some(dir)) => snapshot(dir),
        (None, None) => anyhow::bail!("one of --dir or --repo is required"),
    }
}

/// Human-readable name of the tree being read.
fn describe(source: &SourceArgs) -> String {
    let location = match (&source.location.repo, &source.location.dir) {
        (Some(path), _) | (None, Some(path)) => path.display().to_string(),
        (None, None) => String::new(),
    };
    match &source.reference {
        Some(name) => format!("{location}@{name}"),
        None => location,
    }
}

fn mount(source: &SourceArgs) -> anyhow::Result<TreeFs> {
    let repo = open(source)?;
    let name = source.reference.as_deref().unwrap_or("HEAD");
    let reference = repo
        .find_reference(name)
        .with_context(|| format!("resolving reference {name}"))?;
    Ok(TreeFs::from_reference(&repo, &reference)?)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.no_listing {
        config.directory_listing = false;
    }

    if let Some(name) = &args.source.reference {
        config.reference = name.clone();
    }

    let repo = open(&args.source)?;
    let server = TreeFsServer::from_repository(&repo, config)?;
    println!(
        "{} Serving {} on {}",
        "✓".green().bold(),
        describe(&args.source).bold(),
        format!("http://{}", server.config().bind_addr).cyan()
    );
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_ls(args: LsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let fs = mount(&args.source)?;
    let mut handle = fs.open(&args.path)?;
    let infos = if handle.is_dir() {
        handle.readdir(-1)?
    } else {
        vec![handle.stat()?]
    };
    handle.close()?;

    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = infos.iter().map(info_json).collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Text => {
            for info in &infos {
                println!("{}", ls_line(info));
            }
        }
    }
    Ok(())
}

fn cmd_cat(args: CatArgs) -> anyhow::Result<()> {
    let fs = mount(&args.source)?;
    let mut handle = fs.open(&args.path)?;
    if handle.is_dir() {
        anyhow::bail!("{} is a directory", args.path);
    }
    let data = handle.read_all()?;
    handle.close()?;
    std::io::stdout().lock().write_all(&data)?;
    Ok(())
}

fn cmd_stat(args: StatArgs, format: OutputFormat) -> anyhow::Result<()> {
    let fs = mount(&args.source)?;
    let mut handle = fs.open(&args.path)?;
    let info = handle.stat()?;
    handle.close()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&info_json(&info))?),
        OutputFormat::Text => {
            let name = if info.name().is_empty() { "/" } else { info.name() };
            println!("  Name: {}", name.bold());
            println!("  Type: {}", type_label(info.file_type()));
            println!("  Mode: {}", info.entry_mode());
            println!("  Size: {}", info.size());
            println!("  Modified: {}", info.mod_time().to_rfc3339().dimmed());
        }
    }
    Ok(())
}

fn ls_line(info: &FileInfo) -> String {
    let name = match info.file_type() {
        FileType::Directory => format!("{}/", info.name()).blue().bold().to_string(),
        FileType::Other => info.name().cyan().to_string(),
        FileType::Regular => info.name().to_string(),
    };
    format!("{} {:>10}  {}", info.entry_mode(), info.size(), name)
}

fn type_label(file_type: FileType) -> &'static str {
    match file_type {
        FileType::Regular => "file",
        FileType::Directory => "directory",
        FileType::Other => "other",
    }
}

fn info_json(info: &FileInfo) -> serde_json::Value {
    json!({
        "name": info.name(),
        "size": info.size(),
        "type": type_label(info.file_type()),
        "mode": info.entry_mode().to_string(),
        "modified": info.mod_time().to_rfc3339(),
    })
}
