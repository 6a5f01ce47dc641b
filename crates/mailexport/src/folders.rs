//! Folder tree builder
//!
//! Walks the mail client's folder hierarchy once, depth first, collecting
//! every folder's properties and aggregating item counts bottom-up.

use log::{debug, warn};

use crate::error::SourceError;
use crate::models::{Folder, FolderId, FolderTree};
use crate::source::{ItemSource, MailFolder};

/// Build the folder tree rooted at `root`
///
/// Property read failures leave that property at its zero value. A sub-folder
/// that cannot be opened is skipped entirely: it is neither counted nor
/// descended into.
pub fn build_folder_tree<F: MailFolder>(root: F) -> FolderTree<F> {
    let mut tree = FolderTree {
        folders: Vec::new(),
    };
    visit(&mut tree, root, None);
    tree
}

fn visit<F: MailFolder>(tree: &mut FolderTree<F>, handle: F, parent: Option<FolderId>) -> FolderId {
    let id = FolderId(tree.folders.len());
    let mut folder = Folder::new(id, parent, handle);
    read_properties(&mut folder);
    tree.folders.push(folder);

    match tree.folders[id.0].handle.subfolder_count() {
        Ok(count) => {
            tree.folders[id.0].num_folders = count;
            for position in 1..=count {
                let child = match tree.folders[id.0].handle.subfolder(position) {
                    Ok(child) => child,
                    Err(e) => {
                        warn!(
                            "Skipping sub-folder {} of {}: {}",
                            position, tree.folders[id.0].name, e
                        );
                        continue;
                    }
                };

                let child_id = visit(tree, child, Some(id));
                let child_total = tree.folders[child_id.0].total_items;
                let folder = &mut tree.folders[id.0];
                folder.children.push(child_id);
                folder.total_items += child_total;
            }
        }
        Err(e) => warn!("Failed to list sub-folders of {}: {}", tree.folders[id.0].name, e),
    }

    let folder = &mut tree.folders[id.0];
    match folder.handle.items().and_then(|items| items.count()) {
        Ok(count) => {
            folder.num_items = count;
            folder.total_items += count;
        }
        Err(e) => debug!("No item count for {}: {}", folder.name, e),
    }

    id
}

fn read_properties<F: MailFolder>(folder: &mut Folder<F>) {
    let handle = &folder.handle;
    folder.entry_id = or_default(handle.entry_id(), "EntryID");
    folder.name = or_default(handle.name(), "Name");
    folder.path = or_default(handle.path(), "FolderPath");
    folder.class = or_default(handle.class(), "Class");
    folder.default_item_type = or_default(handle.default_item_type(), "DefaultItemType");
    folder.default_message_class =
        or_default(handle.default_message_class(), "DefaultMessageClass");
    folder.store = or_default(handle.store(), "Store");
}

fn or_default<T: Default>(value: Result<T, SourceError>, property: &str) -> T {
    value.unwrap_or_else(|e| {
        debug!("Folder property {} unreadable: {}", property, e);
        T::default()
    })
}
