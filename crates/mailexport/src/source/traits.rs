//! Mailbox collaborator traits
//!
//! These traits describe the live mail client at the boundary this crate
//! consumes it. Implementations wrap whatever automation interface the host
//! exposes; the rest of the crate never sees the underlying handles.

use chrono::{DateTime, Utc};

use crate::error::SourceError;
use crate::models::StoreInfo;

/// Descriptive information about the connected mail client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
    pub product_code: String,
    pub default_profile: String,
}

/// Field an item collection can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreationTime,
}

impl SortField {
    /// Property name used by the mail client for this field
    pub fn property(&self) -> &'static str {
        match self {
            SortField::CreationTime => "CreationTime",
        }
    }
}

/// Entry point into a mail client session
///
/// The session must already be logged on; the caller owns it for the whole run
/// and injects it here.
pub trait MailClient {
    type Folder: MailFolder;

    /// Client name, version, product code and default profile
    fn info(&self) -> Result<ClientInfo, SourceError>;

    /// Root of the folder hierarchy (the session namespace)
    fn root(&self) -> Result<Self::Folder, SourceError>;
}

/// A folder handle in the mailbox hierarchy
pub trait MailFolder: Sized {
    type Items: ItemSource;

    fn entry_id(&self) -> Result<String, SourceError>;

    fn name(&self) -> Result<String, SourceError>;

    fn path(&self) -> Result<String, SourceError>;

    /// Object class code of the folder
    fn class(&self) -> Result<i32, SourceError>;

    fn default_item_type(&self) -> Result<i32, SourceError>;

    fn default_message_class(&self) -> Result<String, SourceError>;

    /// Owning store; implementations fill whichever fields they can read
    fn store(&self) -> Result<StoreInfo, SourceError>;

    /// Number of direct sub-folders
    fn subfolder_count(&self) -> Result<usize, SourceError>;

    /// Sub-folder at a 1-based position
    fn subfolder(&self, position: usize) -> Result<Self, SourceError>;

    /// Open the folder's item collection
    fn items(&self) -> Result<Self::Items, SourceError>;
}

/// An index-addressed item collection
///
/// Positions are 1-based and only meaningful until the collection is
/// resorted. Handles returned by [`ItemSource::fetch`] must not outlive the
/// iteration that fetched them.
pub trait ItemSource {
    type Item: MailItem;

    fn sort(&mut self, field: SortField, descending: bool) -> Result<(), SourceError>;

    fn count(&self) -> Result<usize, SourceError>;

    fn fetch(&self, position: usize) -> Result<Self::Item, SourceError>;
}

/// A single mail item handle. Dropping it releases the handle.
pub trait MailItem {
    /// Native message object handed to the conversion collaborator
    type Native;

    fn subject(&self) -> Result<String, SourceError>;

    fn message_class(&self) -> Result<String, SourceError>;

    fn creation_time(&self) -> Result<DateTime<Utc>, SourceError>;

    /// Native backing object; failure means the item store is unreadable
    fn native(&self) -> Result<Self::Native, SourceError>;
}
