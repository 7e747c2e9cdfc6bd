use fileworks_core::{
    DEFAULT_BUFFER_SIZE, Entry, EntryKind, Failure, FailureAggregate, FsError, OperationError,
    OpsConfig,
};
use std::fs;
use std::io;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_config_builder_and_defaults() {
    let config = OpsConfig::builder()
        .buffer_size(4096usize)
        .preserve_timestamps(false)
        .progress_interval_ms(250u64)
        .build()
        .unwrap();

    assert_eq!(config.buffer_size, 4096);
    assert!(!config.preserve_timestamps);
    assert_eq!(config.progress_interval().as_millis(), 250);
    assert_eq!(config.channel_size, 100);

    let default_config = OpsConfig::default();
    assert_eq!(default_config.buffer_size, DEFAULT_BUFFER_SIZE);
    assert!(default_config.preserve_timestamps);
}

#[test]
fn test_config_rejects_zero_buffer() {
    assert!(OpsConfig::builder().buffer_size(0usize).build().is_err());
    assert!(OpsConfig::builder().channel_size(0usize).build().is_err());
}

#[test]
fn test_config_serde_fills_defaults() {
    let config: OpsConfig = serde_json::from_str(r#"{ "buffer_size": 1024 }"#).unwrap();
    assert_eq!(config.buffer_size, 1024);
    assert!(config.preserve_timestamps);
    assert_eq!(config.progress_interval_ms, 100);

    let json = serde_json::to_string(&config).unwrap();
    let back: OpsConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back.buffer_size, 1024);
}

#[test]
fn test_entry_stat_does_not_follow_links() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("f");
    fs::write(&file, b"x").unwrap();

    assert_eq!(Entry::stat(&file).unwrap().kind, EntryKind::File);
    assert_eq!(Entry::stat(temp.path()).unwrap().kind, EntryKind::Directory);
    assert!(matches!(
        Entry::stat(temp.path().join("missing")),
        Err(FsError::NotFound { .. })
    ));

    #[cfg(unix)]
    {
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&file, &link).unwrap();
        assert!(Entry::stat(&link).unwrap().kind.is_symlink());
    }
}

#[test]
fn test_entry_serializes() {
    let entry = Entry::new("/data/report.txt", EntryKind::File);
    let json = serde_json::to_string(&entry).unwrap();
    let back: Entry = serde_json::from_str(&json).unwrap();
    assert_eq!(back, entry);
}

#[test]
fn test_aggregate_primary_and_order() {
    let failures = vec![
        Failure::new(
            "/a",
            FsError::io("/a", io::Error::from(io::ErrorKind::PermissionDenied)),
        ),
        Failure::new("/b", FsError::io("/b", io::Error::from(io::ErrorKind::NotFound))),
        Failure::new(
            "/c",
            FsError::io("/c", io::Error::new(io::ErrorKind::Other, "disk on fire")),
        ),
    ];

    let aggregate = FailureAggregate::from_failures(failures).unwrap();
    assert_eq!(aggregate.len(), 3);
    assert_eq!(aggregate.primary().path, PathBuf::from("/a"));
    assert!(matches!(
        aggregate.primary().cause,
        FsError::PermissionDenied { .. }
    ));

    let paths: Vec<_> = aggregate.paths().map(|p| p.to_path_buf()).collect();
    assert_eq!(
        paths,
        vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/c")]
    );
    assert!(aggregate.to_string().contains("3 failures"));

    let source = std::error::Error::source(&aggregate).unwrap();
    assert_eq!(source.to_string(), aggregate.primary().cause.to_string());
}

#[test]
fn test_empty_aggregate_is_none() {
    assert!(FailureAggregate::from_failures(Vec::new()).is_none());
}

#[test]
fn test_operation_error_wraps_aggregate() {
    let aggregate = FailureAggregate::from_failures(vec![Failure::new(
        "/x",
        FsError::io("/x", io::Error::from(io::ErrorKind::NotFound)),
    )])
    .unwrap();

    let err: OperationError = aggregate.into();
    assert!(!err.is_preflight());
    assert_eq!(err.failures().unwrap().len(), 1);
    assert!(err.to_string().contains("/x"));
}
