//! Path resolution against real volume trees

mod common;

use ::common::prelude::*;

#[test]
fn test_traversal_never_escapes() {
    let fx = common::Fixture::new();
    let docs = fx.volume("docs");
    for input in [
        "../../etc/passwd",
        "..",
        "foo/../../public/index.txt",
        "/etc/passwd",
        "foo/bar.txt/../../../x",
    ] {
        assert!(
            matches!(docs.resolve(input), Err(PathError::Escape(_))),
            "{input:?} should escape"
        );
    }
}

#[test]
fn test_resolves_inside_root() {
    let fx = common::Fixture::new();
    let docs = fx.volume("docs");

    let resolved = docs.resolve("foo/bar.txt").unwrap();
    assert!(resolved.starts_with(docs.root()));
    assert_eq!(std::fs::read_to_string(&resolved).unwrap(), "bar");

    assert_eq!(docs.resolve("").unwrap(), docs.root());
    assert_eq!(docs.resolve("foo/./../readme.txt").unwrap(), docs.root().join("readme.txt"));
}

#[test]
fn test_nested_missing_segments_resolve_for_writes() {
    let fx = common::Fixture::new();
    let docs = fx.volume("docs");
    let resolved = docs.resolve("new/deeper/file.txt").unwrap();
    assert_eq!(resolved, docs.root().join("new/deeper/file.txt"));
    assert!(!resolved.exists());
}

#[cfg(unix)]
#[test]
fn test_symlink_escapes_are_refused() {
    let fx = common::Fixture::new();
    let docs = fx.volume("docs");
    let outside = tempfile::tempdir().unwrap();
    std::fs::write(outside.path().join("secret.txt"), "secret").unwrap();

    std::os::unix::fs::symlink(outside.path(), docs.root().join("link")).unwrap();
    std::os::unix::fs::symlink(
        outside.path().join("missing"),
        docs.root().join("dangling"),
    )
    .unwrap();
    std::os::unix::fs::symlink(docs.root().join("foo"), docs.root().join("inner")).unwrap();

    assert!(matches!(docs.resolve("link/secret.txt"), Err(PathError::Escape(_))));
    assert!(matches!(docs.resolve("link/new.txt"), Err(PathError::Escape(_))));
    assert!(matches!(docs.resolve("dangling"), Err(PathError::Escape(_))));
    assert!(docs.resolve("inner/bar.txt").is_ok());
}

#[cfg(unix)]
#[test]
fn test_symlink_loops_fail_closed() {
    let fx = common::Fixture::new();
    let docs = fx.volume("docs");
    std::os::unix::fs::symlink(docs.root().join("b"), docs.root().join("a")).unwrap();
    std::os::unix::fs::symlink(docs.root().join("a"), docs.root().join("b")).unwrap();
    assert!(docs.resolve("a/x").is_err());
}

#[cfg(unix)]
#[test]
fn test_root_created_after_startup_behind_symlink() {
    let dir = tempfile::tempdir().unwrap();
    let real = dir.path().join("real");
    let link = dir.path().join("link");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let volume = Volume::new("late", &link, Privacy::Private, Vec::<String>::new(), Vec::<String>::new());
    assert!(volume.resolve("a.txt").is_err());

    std::fs::create_dir_all(real.join("sub")).unwrap();
    std::fs::write(real.join("sub/a.txt"), "late").unwrap();

    let resolved = volume.resolve("sub/a.txt").unwrap();
    assert_eq!(std::fs::read_to_string(resolved).unwrap(), "late");
    assert!(matches!(volume.resolve("../escape"), Err(PathError::Escape(_))));
    assert_eq!(volume.entries("sub").unwrap().len(), 1);
}
