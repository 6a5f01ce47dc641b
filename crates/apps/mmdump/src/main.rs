//! mmdump - Export mailbox folders into monthly MMDF archives
//!
//! This is the command-line entry point. It drives the export pipeline over a
//! directory-backed mailbox.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use mailexport::source::MailFolder;
use mailexport::{
    Compression, DirMailbox, ExportConfig, FolderTree, RawConverter, StopReason, list_folders,
    parse_day, read_archive,
};

#[derive(Parser)]
#[command(name = "mmdump", version)]
#[command(
    about = "Export mailbox folders into monthly compressed MMDF archives",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every folder of a mailbox with its item totals
    List {
        /// Mailbox root directory
        #[arg(long)]
        root: PathBuf,
    },
    /// Export one folder into month archives
    Export {
        /// Mailbox root directory
        #[arg(long)]
        root: PathBuf,
        /// Folder to export, by display name or full path
        #[arg(long)]
        folder: Option<String>,
        /// Output directory
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Maximum number of messages to export
        #[arg(long)]
        count: Option<usize>,
        /// First day to export (YYYYMMDD)
        #[arg(long, value_parser = parse_day)]
        start_date: Option<NaiveDate>,
        /// Stop before messages created after this day starts (YYYYMMDD)
        #[arg(long, value_parser = parse_day)]
        end_date: Option<NaiveDate>,
        /// Resolve addresses through the address book
        #[arg(long)]
        address_book: bool,
        /// Archive compression (gzip or zstd)
        #[arg(long)]
        compression: Option<Compression>,
        /// Settings file; defaults to export.json in the config directory
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Show the messages stored in archive files
    Inspect {
        /// Archive files (.mmdf.gz or .mmdf.zst)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let cli = Cli::parse();
    match cli.command {
        Commands::List { root } => list(&root),
        Commands::Export {
            root,
            folder,
            dir,
            count,
            start_date,
            end_date,
            address_book,
            compression,
            config,
        } => {
            let mut settings = match config {
                Some(path) => ExportConfig::from_file(&path)?,
                None => ExportConfig::load()?,
            };
            if let Some(folder) = folder {
                settings.folder = folder;
            }
            if let Some(dir) = dir {
                settings.target_dir = dir;
            }
            if let Some(count) = count {
                settings.max_count = count;
            }
            if start_date.is_some() {
                settings.start_date = start_date;
            }
            if end_date.is_some() {
                settings.end_date = end_date;
            }
            if let Some(compression) = compression {
                settings.compression = compression;
            }
            settings.use_address_book |= address_book;
            export(&root, &settings)
        }
        Commands::Inspect { files } => inspect(&files),
    }
}

fn open_mailbox(root: &Path) -> Result<DirMailbox> {
    DirMailbox::open(root).with_context(|| format!("Failed to open mailbox {}", root.display()))
}

fn list(root: &Path) -> Result<()> {
    let mailbox = open_mailbox(root)?;
    let tree = list_folders(&mailbox)?;
    print_tree(&tree);
    Ok(())
}

fn print_tree<F: MailFolder>(tree: &FolderTree<F>) {
    for folder in tree.folders() {
        let indent = "  ".repeat(tree.depth(folder.id));
        println!(
            "{:>4}  {}{:<32}  {:>7} items  {}",
            folder.id.index(),
            indent,
            folder.name,
            folder.total_items,
            folder.path
        );
    }
}

fn export(root: &Path, settings: &ExportConfig) -> Result<()> {
    if settings.folder.is_empty() {
        match ExportConfig::default_config_path() {
            Some(path) => bail!(
                "No folder given; pass --folder or set \"folder\" in {}",
                path.display()
            ),
            None => bail!("No folder given; pass --folder"),
        }
    }

    let mailbox = open_mailbox(root)?;
    let stats = mailexport::run(&mailbox, &mut RawConverter, settings)?;

    match &stats.stop {
        StopReason::Exhausted => {}
        StopReason::Unreadable { position, reason } => {
            warn!("Stopped at item {}: {}", position, reason);
        }
        StopReason::FetchFailed {
            position,
            attempts,
            reason,
        } => {
            warn!(
                "Stopped at item {} after {} fetch attempts: {}",
                position, attempts, reason
            );
        }
    }

    info!(
        "Saved {}, skipped {}, failed {} in {}ms",
        stats.saved, stats.skipped, stats.failed, stats.duration_ms
    );
    for archive in &stats.archives {
        println!("{}", archive.display());
    }
    Ok(())
}

fn inspect(files: &[PathBuf]) -> Result<()> {
    for file in files {
        let messages = read_archive(file)?;
        let bytes: usize = messages.iter().map(Vec::len).sum();
        println!(
            "{}: {} messages, {} bytes",
            file.display(),
            messages.len(),
            bytes
        );
    }
    Ok(())
}
