//! Mailexport - Mailbox folder export into monthly MMDF archives
//!
//! This crate provides the export pipeline independent of any particular mail
//! client:
//! - Collaborator traits for the mail client and the message converter
//! - Folder hierarchy building with aggregated item counts
//! - Binary-search date range resolution over sorted item collections
//! - A failure-tolerant export loop
//! - Month-rotating compressed archive output with MMDF framing
//!
//! Bundled collaborators (an in-memory mailbox, a directory-backed mailbox and
//! a pass-through converter) let the pipeline run without a live client.

pub mod archive;
pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod extract;
pub mod folders;
pub mod models;
pub mod range;
pub mod source;

pub use archive::{ArchiveWriter, Compression, POSTMARK, read_archive};
pub use crate::config::{ExportConfig, parse_day};
pub use convert::{
    BodyEncoding, ConversionOptions, ConversionStream, MemoryStream, MessageConverter,
    RawConverter, SaveFormat,
};
pub use error::{ArchiveError, ConvertError, ExportError, ExtractError, SourceError};
pub use export::{
    ExportOptions, ExportStats, StopReason, export_folder, export_window, list_folders, run,
};
pub use extract::{ExtractedMessage, Extraction, extract_message};
pub use folders::build_folder_tree;
pub use models::{Folder, FolderId, FolderTree, StoreInfo};
pub use range::{ExportWindow, find_first_item_after, resolve_window};
pub use source::{
    ClientInfo, DirMailbox, ItemSource, MailClient, MailFolder, MailItem, MemoryMailbox, SortField,
};
