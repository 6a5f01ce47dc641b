//! Directory-backed mailbox
//!
//! Treats a directory tree as a mailbox: every directory is a folder and every
//! regular, non-hidden file inside it is one message whose bytes are already
//! in their final form.
//!
//! ```text
//! mail/                 # root folder
//!   Inbox/
//!     0001.eml
//!     0002.eml
//!     Projects/
//!       0003.eml
//!   Sent/
//! ```

use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use log::debug;

use super::{ClientInfo, ItemSource, MailClient, MailFolder, MailItem, SortField};
use crate::error::SourceError;
use crate::models::StoreInfo;

/// Message class reported for every file
const FILE_MESSAGE_CLASS: &str = "IPM.Note";

/// Mailbox rooted at a directory
pub struct DirMailbox {
    root: PathBuf,
}

impl DirMailbox {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, SourceError> {
        let root = fs::canonicalize(root.as_ref())?;
        if !fs::metadata(&root)?.is_dir() {
            return Err(SourceError::Collection(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }
}

impl MailClient for DirMailbox {
    type Folder = DirFolder;

    fn info(&self) -> Result<ClientInfo, SourceError> {
        Ok(ClientInfo {
            name: "Directory".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            product_code: String::new(),
            default_profile: self.root.display().to_string(),
        })
    }

    fn root(&self) -> Result<DirFolder, SourceError> {
        let name = file_name(&self.root);
        let store = StoreInfo {
            name: name.clone(),
            path: self.root.display().to_string(),
        };
        Ok(DirFolder {
            dir: self.root.clone(),
            path: format!("\\\\{}", name),
            store,
            children: OnceCell::new(),
        })
    }
}

/// A directory in a [`DirMailbox`]
pub struct DirFolder {
    dir: PathBuf,
    path: String,
    store: StoreInfo,
    children: OnceCell<Vec<PathBuf>>,
}

impl DirFolder {
    fn child_dirs(&self) -> Result<&[PathBuf], SourceError> {
        if let Some(children) = self.children.get() {
            return Ok(children);
        }
        let listed = list(&self.dir, true)?;
        Ok(self.children.get_or_init(|| listed))
    }
}

impl MailFolder for DirFolder {
    type Items = DirItems;

    fn entry_id(&self) -> Result<String, SourceError> {
        Ok(self.dir.display().to_string())
    }

    fn name(&self) -> Result<String, SourceError> {
        Ok(file_name(&self.dir))
    }

    fn path(&self) -> Result<String, SourceError> {
        Ok(self.path.clone())
    }

    fn class(&self) -> Result<i32, SourceError> {
        Ok(2)
    }

    fn default_item_type(&self) -> Result<i32, SourceError> {
        Ok(0)
    }

    fn default_message_class(&self) -> Result<String, SourceError> {
        Ok(FILE_MESSAGE_CLASS.to_string())
    }

    fn store(&self) -> Result<StoreInfo, SourceError> {
        Ok(self.store.clone())
    }

    fn subfolder_count(&self) -> Result<usize, SourceError> {
        Ok(self.child_dirs()?.len())
    }

    fn subfolder(&self, position: usize) -> Result<DirFolder, SourceError> {
        let dir = position
            .checked_sub(1)
            .and_then(|i| self.child_dirs().ok()?.get(i))
            .ok_or_else(|| SourceError::Subfolder {
                position,
                reason: "out of range".to_string(),
            })?;

        Ok(DirFolder {
            dir: dir.clone(),
            path: format!("{}\\{}", self.path, file_name(dir)),
            store: self.store.clone(),
            children: OnceCell::new(),
        })
    }

    fn items(&self) -> Result<DirItems, SourceError> {
        let entries = list(&self.dir, false)?
            .into_iter()
            .map(|path| {
                let created = creation_time(&path);
                DirItem { path, created }
            })
            .collect();
        Ok(DirItems { entries })
    }
}

/// Files of one [`DirFolder`]
pub struct DirItems {
    entries: Vec<DirItem>,
}

impl ItemSource for DirItems {
    type Item = DirItem;

    fn sort(&mut self, field: SortField, descending: bool) -> Result<(), SourceError> {
        match field {
            SortField::CreationTime => self
                .entries
                .sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.path.cmp(&b.path))),
        }
        if descending {
            self.entries.reverse();
        }
        Ok(())
    }

    fn count(&self) -> Result<usize, SourceError> {
        Ok(self.entries.len())
    }

    fn fetch(&self, position: usize) -> Result<DirItem, SourceError> {
        position
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .cloned()
            .ok_or_else(|| SourceError::Fetch {
                position,
                reason: "out of range".to_string(),
            })
    }
}

/// One file in a [`DirFolder`]
#[derive(Debug, Clone)]
pub struct DirItem {
    path: PathBuf,
    created: Option<DateTime<Utc>>,
}

impl MailItem for DirItem {
    type Native = PathBuf;

    fn subject(&self) -> Result<String, SourceError> {
        Ok(file_name(&self.path))
    }

    fn message_class(&self) -> Result<String, SourceError> {
        Ok(FILE_MESSAGE_CLASS.to_string())
    }

    fn creation_time(&self) -> Result<DateTime<Utc>, SourceError> {
        self.created
            .ok_or_else(|| SourceError::property("CreationTime", "file times unavailable"))
    }

    fn native(&self) -> Result<PathBuf, SourceError> {
        Ok(self.path.clone())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// List non-hidden directories (or regular files) directly under `dir`, sorted by name
fn list(dir: &Path, dirs: bool) -> Result<Vec<PathBuf>, SourceError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let file_type = entry.file_type()?;
        let wanted = if dirs {
            file_type.is_dir()
        } else {
            file_type.is_file()
        };
        if wanted {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

fn creation_time(path: &Path) -> Option<DateTime<Utc>> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            debug!("No metadata for {}: {}", path.display(), e);
            return None;
        }
    };
    let time: SystemTime = metadata.created().or_else(|_| metadata.modified()).ok()?;
    Some(DateTime::<Utc>::from(time))
}
