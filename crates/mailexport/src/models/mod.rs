//! Domain models for the folder hierarchy

mod folder;

pub use folder::{Folder, FolderId, FolderTree, StoreInfo};
