//! Folder export
//!
//! Ties the pipeline together: locate the folder, resolve the date window
//! over its sorted items, then run the export loop into month archives.

mod engine;

use std::fs;
use std::path::PathBuf;

use log::{info, warn};

use crate::archive::ArchiveWriter;
use crate::config::ExportConfig;
use crate::convert::{ConversionStream, MemoryStream, MessageConverter};
use crate::error::ExportError;
use crate::folders::build_folder_tree;
use crate::models::{Folder, FolderTree};
use crate::range::{ExportWindow, resolve_window};
use crate::source::{ItemSource, MailClient, MailFolder, MailItem, SortField};

pub use engine::export_window;

/// Native message handle of the items in folder type `F`
pub type FolderNative<F> =
    <<<F as MailFolder>::Items as ItemSource>::Item as MailItem>::Native;

/// Tuning for the export loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Consecutive fetch failures tolerated at one position before stopping
    pub max_fetch_retries: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { max_fetch_retries: 3 }
    }
}

impl From<&ExportConfig> for ExportOptions {
    fn from(config: &ExportConfig) -> Self {
        Self {
            max_fetch_retries: config.max_fetch_retries,
        }
    }
}

/// Why the export loop ended
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StopReason {
    /// Every item in the window was visited
    #[default]
    Exhausted,
    /// An item's backing object could not be read
    Unreadable { position: usize, reason: String },
    /// Fetching one position kept failing
    FetchFailed {
        position: usize,
        attempts: u32,
        reason: String,
    },
}

/// Statistics from an export run
#[derive(Debug, Default, Clone)]
pub struct ExportStats {
    /// Messages written to an archive
    pub saved: usize,
    /// Items with nothing to write (filtered class or empty conversion)
    pub skipped: usize,
    /// Items that failed to extract and were passed over
    pub failed: usize,
    /// Fetch attempts repeated after a failure
    pub fetch_retries: u32,
    /// Archive files produced, in order of first use
    pub archives: Vec<PathBuf>,
    pub stop: StopReason,
    pub window: ExportWindow,
    pub duration_ms: u64,
}

impl ExportStats {
    /// Whether the loop ended before the window was exhausted
    pub fn stopped_early(&self) -> bool {
        self.stop != StopReason::Exhausted
    }
}

/// Build the folder tree of `client` for listing
pub fn list_folders<C: MailClient>(client: &C) -> Result<FolderTree<C::Folder>, ExportError> {
    Ok(build_folder_tree(client.root()?))
}

/// Export one folder into month archives under `config.target_dir`
pub fn export_folder<F, V>(
    folder: &Folder<F>,
    config: &ExportConfig,
    converter: &mut V,
    stream: &mut dyn ConversionStream,
) -> Result<ExportStats, ExportError>
where
    F: MailFolder,
    V: MessageConverter<FolderNative<F>> + ?Sized,
{
    let dir = &config.target_dir;
    fs::create_dir_all(dir).map_err(|source| ExportError::OutputDir {
        path: dir.clone(),
        source,
    })?;

    let mut items = folder.handle().items()?;
    items.sort(SortField::CreationTime, false)?;
    let total = items.count()?;

    let window = resolve_window(
        &items,
        total,
        config.start_date,
        config.end_date,
        config.max_count,
    );
    info!(
        "Folder {} : total {}, from {}, to {}, count {}",
        folder.name,
        total,
        window.start,
        window.end,
        window.len()
    );

    let mut writer = ArchiveWriter::new(dir, folder.name.as_str(), config.compression);
    export_window(
        &items,
        total,
        window,
        converter,
        stream,
        &mut writer,
        &ExportOptions::from(config),
    )
}

/// Run a complete export against a connected mail client
///
/// Builds the folder tree, selects `config.folder`, prepares the converter and
/// exports the folder through a single reusable conversion stream.
pub fn run<C, V>(
    client: &C,
    converter: &mut V,
    config: &ExportConfig,
) -> Result<ExportStats, ExportError>
where
    C: MailClient,
    V: MessageConverter<FolderNative<C::Folder>> + ?Sized,
{
    let client_info = client.info()?;
    info!(
        "Mail client: {} {} {}",
        client_info.name, client_info.version, client_info.product_code
    );
    if !client_info.default_profile.is_empty() {
        info!("Default profile: {}", client_info.default_profile);
    }

    let tree = build_folder_tree(client.root()?);
    info!("Found {} folders", tree.len());

    let folder = tree
        .find(&config.folder)
        .ok_or_else(|| ExportError::FolderNotFound(config.folder.clone()))?;
    info!("Exporting {} ({} items)", folder.path, folder.num_items);

    if let Err(e) = converter.configure(&config.conversion) {
        warn!("Converter options not applied: {}", e);
    }
    if config.use_address_book {
        if let Err(e) = converter.attach_address_book() {
            warn!("Address book unavailable: {}", e);
        }
    }

    let mut stream = MemoryStream::new();
    export_folder(folder, config, converter, &mut stream)
}
