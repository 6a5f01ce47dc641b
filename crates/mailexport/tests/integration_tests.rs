//! Integration tests for the mailexport crate
//!
//! These tests verify the complete flow from a mailbox to archives on disk.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use mailexport::source::{MemoryFolder, MemoryItem};
use mailexport::{
    Compression, DirMailbox, ExportConfig, ExportError, MemoryMailbox, RawConverter, StopReason,
    list_folders, read_archive, run,
};
use tempfile::TempDir;

/// Helper to create a message created at noon on the given day
fn make_message(subject: &str, year: i32, month: u32, day: u32) -> MemoryItem {
    let created: DateTime<Utc> = Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap();
    let body = format!(
        "From: sender@example.com\r\nSubject: {}\r\n\r\nBody of {}\r\n",
        subject, subject
    );
    MemoryItem::new(subject, "IPM.Note", created, body)
}

/// A mailbox with an Inbox spanning three months and a nested Projects folder
fn make_mailbox() -> MemoryMailbox {
    let projects = MemoryFolder::builder("Projects")
        .item(make_message("Roadmap", 2023, 3, 1))
        .build();
    let inbox = MemoryFolder::builder("Inbox")
        .items([
            make_message("Kickoff", 2023, 1, 5),
            make_message("Follow up", 2023, 1, 20),
            make_message("Invoice", 2023, 2, 2),
            make_message("Quarterly", 2023, 3, 31),
        ])
        .child(projects)
        .build();
    let root = MemoryFolder::builder("Mailbox")
        .child(inbox)
        .child(MemoryFolder::builder("Sent Items").build())
        .build();
    MemoryMailbox::new(root)
}

fn make_config(folder: &str, dir: &TempDir) -> ExportConfig {
    ExportConfig {
        folder: folder.to_string(),
        target_dir: dir.path().to_path_buf(),
        ..Default::default()
    }
}

#[test]
fn test_full_export() {
    let dir = TempDir::new().unwrap();

    let stats = run(&make_mailbox(), &mut RawConverter, &make_config("Inbox", &dir)).unwrap();

    assert_eq!(stats.saved, 4);
    assert_eq!(stats.stop, StopReason::Exhausted);
    assert_eq!(stats.archives.len(), 3);

    let counts: Vec<usize> = stats
        .archives
        .iter()
        .map(|path| read_archive(path).unwrap().len())
        .collect();
    assert_eq!(counts, vec![2, 1, 1]);

    // Sub-folder items are not part of the folder's own export
    let march = read_archive(&dir.path().join("Inbox_202303.mmdf.gz")).unwrap();
    assert!(String::from_utf8_lossy(&march[0]).contains("Subject: Quarterly"));
}

#[test]
fn test_date_window_export() {
    let dir = TempDir::new().unwrap();
    let config = ExportConfig {
        start_date: NaiveDate::from_ymd_opt(2023, 1, 15),
        end_date: NaiveDate::from_ymd_opt(2023, 3, 1),
        compression: Compression::Zstd,
        ..make_config("Inbox", &dir)
    };

    let stats = run(&make_mailbox(), &mut RawConverter, &config).unwrap();

    assert_eq!(stats.saved, 2);
    assert_eq!((stats.window.start, stats.window.end), (1, 3));
    assert!(dir.path().join("Inbox_202301.mmdf.zst").exists());
    assert!(dir.path().join("Inbox_202302.mmdf.zst").exists());
    assert!(!dir.path().join("Inbox_202303.mmdf.zst").exists());
}

#[test]
fn test_export_nested_folder_by_path() {
    let dir = TempDir::new().unwrap();
    let config = make_config("\\\\Mailbox\\Inbox\\Projects", &dir);

    let stats = run(&make_mailbox(), &mut RawConverter, &config).unwrap();

    assert_eq!(stats.saved, 1);
    assert_eq!(
        read_archive(&dir.path().join("Projects_202303.mmdf.gz")).unwrap().len(),
        1
    );
}

#[test]
fn test_empty_folder_writes_no_archives() {
    let dir = TempDir::new().unwrap();

    let stats = run(&make_mailbox(), &mut RawConverter, &make_config("Sent Items", &dir)).unwrap();

    assert_eq!(stats.saved, 0);
    assert!(stats.archives.is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_hard_stop_keeps_earlier_months() {
    let dir = TempDir::new().unwrap();
    let inbox = MemoryFolder::builder("Inbox")
        .items([
            make_message("January", 2023, 1, 5),
            make_message("February", 2023, 2, 5),
            make_message("Corrupt", 2023, 3, 5).unreadable_native(),
            make_message("April", 2023, 4, 5),
        ])
        .build();
    let mailbox = MemoryMailbox::new(MemoryFolder::builder("Mailbox").child(inbox).build());

    let stats = run(&mailbox, &mut RawConverter, &make_config("Inbox", &dir)).unwrap();

    assert_eq!(stats.saved, 2);
    assert!(matches!(stats.stop, StopReason::Unreadable { position: 3, .. }));
    for name in ["Inbox_202301.mmdf.gz", "Inbox_202302.mmdf.gz"] {
        assert_eq!(read_archive(&dir.path().join(name)).unwrap().len(), 1);
    }
    assert!(!dir.path().join("Inbox_202304.mmdf.gz").exists());
}

#[test]
fn test_missing_folder() {
    let dir = TempDir::new().unwrap();
    let err = run(&make_mailbox(), &mut RawConverter, &make_config("Drafts", &dir)).unwrap_err();
    assert!(matches!(err, ExportError::FolderNotFound(_)));
}

#[test]
fn test_folder_listing_totals() {
    let tree = list_folders(&make_mailbox()).unwrap();

    let summary: Vec<(&str, usize, usize)> = tree
        .folders()
        .iter()
        .map(|f| (f.name.as_str(), f.num_items, f.total_items))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Mailbox", 0, 5),
            ("Inbox", 4, 5),
            ("Projects", 1, 1),
            ("Sent Items", 0, 0),
        ]
    );
}

#[test]
fn test_directory_mailbox_export() {
    let mail = TempDir::new().unwrap();
    let inbox = mail.path().join("Inbox");
    std::fs::create_dir(&inbox).unwrap();
    let bodies = [
        "Subject: first\r\n\r\none\r\n",
        "Subject: second\r\n\r\ntwo\r\n",
        "Subject: third\r\n\r\nthree\r\n",
    ];
    for (i, body) in bodies.iter().enumerate() {
        std::fs::write(inbox.join(format!("{:04}.eml", i)), body).unwrap();
    }
    std::fs::write(inbox.join(".index"), "not a message").unwrap();

    let out = TempDir::new().unwrap();
    let mailbox = DirMailbox::open(mail.path()).unwrap();
    let config = ExportConfig {
        folder: "Inbox".to_string(),
        target_dir: out.path().to_path_buf(),
        ..Default::default()
    };

    let stats = run(&mailbox, &mut RawConverter, &config).unwrap();

    assert_eq!(stats.saved, 3);
    let mut exported: Vec<Vec<u8>> = stats
        .archives
        .iter()
        .flat_map(|path| read_archive(path).unwrap())
        .collect();
    exported.sort();
    let expected: Vec<Vec<u8>> = bodies.iter().map(|b| b.as_bytes().to_vec()).collect();
    assert_eq!(exported, expected);
}
