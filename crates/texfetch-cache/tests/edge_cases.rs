//! Edge case tests for texfetch-cache
//!
//! Cache root creation, path resolution, and both overwrite policies.

use std::fs;
use std::path::Path;

use texfetch_cache::*;

// ============================================================================
// LAYOUT TESTS
// ============================================================================

#[test]
fn test_layout_creates_root_idempotently() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("data").join(TEXTURES_DIR);

    let layout = CacheLayout::create(&root).unwrap();
    assert!(root.is_dir());
    CacheLayout::create(&root).unwrap();

    assert_eq!(layout.resolve("https://x.test/img.png"), root.join("img.png"));
}

#[test]
fn test_layout_root_is_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("occupied");
    fs::write(&root, b"x").unwrap();

    assert!(matches!(CacheLayout::create(&root), Err(CacheError::CreateRoot { .. })));
}

#[test]
fn test_flat_layout_ignores_url_directories() {
    let root = Path::new("/cache");
    assert_eq!(
        resolve(root, "https://a.test/x/y/same.png"),
        resolve(root, "https://b.test/other/same.png")
    );
}

#[test]
fn test_default_root_ends_in_textures() {
    if let Ok(root) = default_cache_root("texfetch") {
        assert!(root.ends_with(Path::new("texfetch").join(TEXTURES_DIR)));
    }
}

// ============================================================================
// PERSIST TESTS
// ============================================================================

#[test]
fn test_skip_if_exists_keeps_original() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("img.png");
    fs::write(&path, b"old").unwrap();

    let outcome = smol::block_on(CachePersister::new().persist(&path, b"new", OverwritePolicy::SkipIfExists));

    assert_eq!(outcome, PersistOutcome::Skipped);
    assert_eq!(fs::read(&path).unwrap(), b"old");
}

#[test]
fn test_overwrite_replaces_original() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tex.ktx");
    fs::write(&path, b"old").unwrap();

    let outcome = smol::block_on(CachePersister::new().persist(&path, b"new", OverwritePolicy::Overwrite));

    assert_eq!(outcome, PersistOutcome::Written);
    assert_eq!(fs::read(&path).unwrap(), b"new");
}

#[test]
fn test_write_new_entry_leaves_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("img.png");

    let outcome = smol::block_on(CachePersister::new().persist(&path, b"bytes", OverwritePolicy::SkipIfExists));

    assert_eq!(outcome, PersistOutcome::Written);
    let names: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
    assert_eq!(names, vec![std::ffi::OsString::from("img.png")]);
}

#[test]
fn test_write_failure_is_absorbed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("img.png");

    let persister = CachePersister::new();
    let outcome = smol::block_on(persister.persist(&path, b"bytes", OverwritePolicy::Overwrite));
    assert_eq!(outcome, PersistOutcome::Failed);

    let err = smol::block_on(persister.try_persist(&path, b"bytes", OverwritePolicy::Overwrite)).unwrap_err();
    assert!(matches!(err, CacheError::Write { .. }));
}
