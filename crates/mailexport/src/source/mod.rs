//! Mailbox collaborator abstraction and bundled implementations
//!
//! The trait-based design keeps the live mail client behind a narrow seam so
//! the export pipeline can run against an in-memory mailbox in tests and a
//! directory tree from the command line.

pub mod dir;
pub mod memory;
mod traits;

pub use dir::DirMailbox;
pub use memory::{MemoryFolder, MemoryItem, MemoryMailbox};
pub use traits::{ClientInfo, ItemSource, MailClient, MailFolder, MailItem, SortField};
