//! Folder model and the arena that owns a built folder hierarchy

/// Owning store of a folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreInfo {
    /// Display name of the store
    pub name: String,
    /// File backing the store, if any
    pub path: String,
}

/// Index of a folder inside its [`FolderTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderId(pub(crate) usize);

impl FolderId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A node in the mailbox folder hierarchy
///
/// Built once by [`crate::folders::build_folder_tree`] and immutable afterwards.
#[derive(Debug)]
pub struct Folder<F> {
    pub id: FolderId,
    pub entry_id: String,
    pub name: String,
    pub path: String,
    /// Non-owning back-reference; `None` for the root
    pub parent: Option<FolderId>,
    /// Children in the order the mail client exposes them
    pub children: Vec<FolderId>,
    /// Direct sub-folders reported by the client, including unreadable ones
    pub num_folders: usize,
    /// Items directly in this folder
    pub num_items: usize,
    /// Items in this folder and every readable descendant
    pub total_items: usize,
    pub store: StoreInfo,
    pub class: i32,
    pub default_item_type: i32,
    pub default_message_class: String,
    pub(crate) handle: F,
}

impl<F> Folder<F> {
    pub(crate) fn new(id: FolderId, parent: Option<FolderId>, handle: F) -> Self {
        Self {
            id,
            entry_id: String::new(),
            name: String::new(),
            path: String::new(),
            parent,
            children: Vec::new(),
            num_folders: 0,
            num_items: 0,
            total_items: 0,
            store: StoreInfo::default(),
            class: 0,
            default_item_type: 0,
            default_message_class: String::new(),
            handle,
        }
    }

    /// Collaborator handle for this folder
    pub fn handle(&self) -> &F {
        &self.handle
    }
}

/// Arena owning every folder of one hierarchy
///
/// Folders are stored in depth-first pre-order: the root first, every parent
/// before its children, siblings in client order.
#[derive(Debug)]
pub struct FolderTree<F> {
    pub(crate) folders: Vec<Folder<F>>,
}

impl<F> FolderTree<F> {
    pub fn root(&self) -> &Folder<F> {
        &self.folders[0]
    }

    /// Every folder, flattened in depth-first pre-order
    pub fn folders(&self) -> &[Folder<F>] {
        &self.folders
    }

    pub fn get(&self, id: FolderId) -> Option<&Folder<F>> {
        self.folders.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn parent(&self, id: FolderId) -> Option<&Folder<F>> {
        self.get(id)?.parent.and_then(|p| self.get(p))
    }

    pub fn children(&self, id: FolderId) -> impl Iterator<Item = &Folder<F>> {
        self.get(id)
            .into_iter()
            .flat_map(|f| f.children.iter())
            .filter_map(|c| self.get(*c))
    }

    /// Number of ancestors between a folder and the root
    pub fn depth(&self, id: FolderId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).and_then(|f| f.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.get(parent).and_then(|f| f.parent);
        }
        depth
    }

    /// Find a folder by display name, falling back to full path
    ///
    /// Every name in the tree is checked before any path.
    pub fn find(&self, query: &str) -> Option<&Folder<F>> {
        self.folders
            .iter()
            .find(|f| f.name == query)
            .or_else(|| self.folders.iter().find(|f| f.path == query))
    }
}
