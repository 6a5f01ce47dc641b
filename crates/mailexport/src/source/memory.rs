//! In-memory mailbox
//!
//! A mail client stand-in with fault injection, used by tests and for wiring
//! the export pipeline without a live client. Handles are reference counted
//! and cheap to clone, like the positional handles of a real client.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use super::{ClientInfo, ItemSource, MailClient, MailFolder, MailItem, SortField};
use crate::error::SourceError;
use crate::models::StoreInfo;

/// In-memory implementation of [`MailClient`]
pub struct MemoryMailbox {
    info: ClientInfo,
    root: MemoryFolder,
}

impl MemoryMailbox {
    pub fn new(root: MemoryFolder) -> Self {
        Self {
            info: ClientInfo {
                name: "Memory".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            root,
        }
    }
}

impl MailClient for MemoryMailbox {
    type Folder = MemoryFolder;

    fn info(&self) -> Result<ClientInfo, SourceError> {
        Ok(self.info.clone())
    }

    fn root(&self) -> Result<MemoryFolder, SourceError> {
        Ok(self.root.clone())
    }
}

struct FolderData {
    name: String,
    path: Option<String>,
    store: StoreInfo,
    unreadable: bool,
    unlistable: bool,
    items_unavailable: bool,
    /// `None` marks a sub-folder slot that fails to open
    children: Vec<Option<MemoryFolder>>,
    items: Vec<MemoryItem>,
}

/// Folder handle of a [`MemoryMailbox`]
#[derive(Clone)]
pub struct MemoryFolder {
    data: Rc<FolderData>,
    parent_path: Option<String>,
}

impl MemoryFolder {
    pub fn builder(name: impl Into<String>) -> MemoryFolderBuilder {
        MemoryFolderBuilder {
            data: FolderData {
                name: name.into(),
                path: None,
                store: StoreInfo::default(),
                unreadable: false,
                unlistable: false,
                items_unavailable: false,
                children: Vec::new(),
                items: Vec::new(),
            },
        }
    }

    fn check(&self, name: &'static str) -> Result<(), SourceError> {
        if self.data.unreadable {
            Err(SourceError::property(name, "access denied"))
        } else {
            Ok(())
        }
    }

    fn full_path(&self) -> String {
        if let Some(path) = &self.data.path {
            return path.clone();
        }
        match &self.parent_path {
            Some(parent) => format!("{}\\{}", parent, self.data.name),
            None => format!("\\\\{}", self.data.name),
        }
    }
}

/// Builder for [`MemoryFolder`]
pub struct MemoryFolderBuilder {
    data: FolderData,
}

impl MemoryFolderBuilder {
    /// Override the computed folder path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.data.path = Some(path.into());
        self
    }

    pub fn store(mut self, store: StoreInfo) -> Self {
        self.data.store = store;
        self
    }

    pub fn child(mut self, child: MemoryFolder) -> Self {
        self.data.children.push(Some(child));
        self
    }

    /// Add a sub-folder slot whose handle cannot be opened
    pub fn broken_child(mut self) -> Self {
        self.data.children.push(None);
        self
    }

    pub fn item(mut self, item: MemoryItem) -> Self {
        self.data.items.push(item);
        self
    }

    pub fn items(mut self, items: impl IntoIterator<Item = MemoryItem>) -> Self {
        self.data.items.extend(items);
        self
    }

    /// Make every descriptive property fail to read
    pub fn unreadable_properties(mut self) -> Self {
        self.data.unreadable = true;
        self
    }

    /// Make the sub-folder collection fail to open
    pub fn unlistable_subfolders(mut self) -> Self {
        self.data.unlistable = true;
        self
    }

    /// Make the item collection fail to open
    pub fn unreadable_items(mut self) -> Self {
        self.data.items_unavailable = true;
        self
    }

    pub fn build(self) -> MemoryFolder {
        MemoryFolder {
            data: Rc::new(self.data),
            parent_path: None,
        }
    }
}

impl MailFolder for MemoryFolder {
    type Items = MemoryItems;

    fn entry_id(&self) -> Result<String, SourceError> {
        self.check("EntryID")?;
        Ok(format!("{:016x}", Rc::as_ptr(&self.data) as usize))
    }

    fn name(&self) -> Result<String, SourceError> {
        self.check("Name")?;
        Ok(self.data.name.clone())
    }

    fn path(&self) -> Result<String, SourceError> {
        self.check("FolderPath")?;
        Ok(self.full_path())
    }

    fn class(&self) -> Result<i32, SourceError> {
        self.check("Class")?;
        Ok(2)
    }

    fn default_item_type(&self) -> Result<i32, SourceError> {
        self.check("DefaultItemType")?;
        Ok(0)
    }

    fn default_message_class(&self) -> Result<String, SourceError> {
        self.check("DefaultMessageClass")?;
        Ok("IPM.Note".to_string())
    }

    fn store(&self) -> Result<StoreInfo, SourceError> {
        self.check("Store")?;
        Ok(self.data.store.clone())
    }

    fn subfolder_count(&self) -> Result<usize, SourceError> {
        if self.data.unlistable {
            return Err(SourceError::property("Folders", "access denied"));
        }
        Ok(self.data.children.len())
    }

    fn subfolder(&self, position: usize) -> Result<MemoryFolder, SourceError> {
        let slot = position
            .checked_sub(1)
            .and_then(|i| self.data.children.get(i))
            .ok_or_else(|| SourceError::Subfolder {
                position,
                reason: "out of range".to_string(),
            })?;
        let child = slot.as_ref().ok_or_else(|| SourceError::Subfolder {
            position,
            reason: "folder handle unavailable".to_string(),
        })?;

        Ok(MemoryFolder {
            data: Rc::clone(&child.data),
            parent_path: Some(self.full_path()),
        })
    }

    fn items(&self) -> Result<MemoryItems, SourceError> {
        if self.data.items_unavailable {
            return Err(SourceError::Collection(format!(
                "items of {} unavailable",
                self.data.name
            )));
        }
        Ok(MemoryItems {
            items: self.data.items.clone(),
            fetches: Cell::new(0),
        })
    }
}

/// Item collection of a [`MemoryFolder`]
pub struct MemoryItems {
    items: Vec<MemoryItem>,
    fetches: Cell<usize>,
}

impl MemoryItems {
    /// Number of fetch calls made so far, successful or not
    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }
}

impl ItemSource for MemoryItems {
    type Item = MemoryItem;

    fn sort(&mut self, field: SortField, descending: bool) -> Result<(), SourceError> {
        match field {
            SortField::CreationTime => self.items.sort_by_key(|item| item.data.created),
        }
        if descending {
            self.items.reverse();
        }
        Ok(())
    }

    fn count(&self) -> Result<usize, SourceError> {
        Ok(self.items.len())
    }

    fn fetch(&self, position: usize) -> Result<MemoryItem, SourceError> {
        self.fetches.set(self.fetches.get() + 1);

        let item = position
            .checked_sub(1)
            .and_then(|i| self.items.get(i))
            .ok_or_else(|| SourceError::Fetch {
                position,
                reason: "out of range".to_string(),
            })?;

        if item.data.not_a_message {
            return Err(SourceError::UnexpectedKind { position });
        }

        let pending = item.data.fetch_failures.get();
        if pending > 0 {
            item.data.fetch_failures.set(pending - 1);
            return Err(SourceError::Fetch {
                position,
                reason: "server busy".to_string(),
            });
        }

        Ok(item.clone())
    }
}

#[derive(Clone)]
struct ItemData {
    subject: String,
    class: String,
    created: Option<DateTime<Utc>>,
    body: Rc<[u8]>,
    native_unreadable: bool,
    not_a_message: bool,
    fetch_failures: Cell<u32>,
}

/// Item handle of a [`MemoryItems`] collection
#[derive(Clone)]
pub struct MemoryItem {
    data: Rc<ItemData>,
}

impl MemoryItem {
    pub fn new(
        subject: impl Into<String>,
        class: impl Into<String>,
        created: DateTime<Utc>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            data: Rc::new(ItemData {
                subject: subject.into(),
                class: class.into(),
                created: Some(created),
                body: Rc::from(body.into()),
                native_unreadable: false,
                not_a_message: false,
                fetch_failures: Cell::new(0),
            }),
        }
    }

    fn modify(self, f: impl FnOnce(&mut ItemData)) -> Self {
        let mut data = Rc::unwrap_or_clone(self.data);
        f(&mut data);
        Self {
            data: Rc::new(data),
        }
    }

    /// Make the native backing object unreadable
    pub fn unreadable_native(self) -> Self {
        self.modify(|d| d.native_unreadable = true)
    }

    /// Make the creation time unreadable
    pub fn without_creation_time(self) -> Self {
        self.modify(|d| d.created = None)
    }

    /// Make every fetch of this item return a handle of the wrong kind
    pub fn not_a_message(self) -> Self {
        self.modify(|d| d.not_a_message = true)
    }

    /// Fail the next `count` fetches of this item
    pub fn failing_fetches(self, count: u32) -> Self {
        self.modify(|d| d.fetch_failures = Cell::new(count))
    }
}

impl MailItem for MemoryItem {
    type Native = Rc<[u8]>;

    fn subject(&self) -> Result<String, SourceError> {
        Ok(self.data.subject.clone())
    }

    fn message_class(&self) -> Result<String, SourceError> {
        Ok(self.data.class.clone())
    }

    fn creation_time(&self) -> Result<DateTime<Utc>, SourceError> {
        self.data
            .created
            .ok_or_else(|| SourceError::property("CreationTime", "not set"))
    }

    fn native(&self) -> Result<Rc<[u8]>, SourceError> {
        if self.data.native_unreadable {
            return Err(SourceError::property("MAPIOBJECT", "store unavailable"));
        }
        Ok(Rc::clone(&self.data.body))
    }
}
