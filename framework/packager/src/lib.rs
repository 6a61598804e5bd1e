use flate2::write::GzEncoder;
use flate2::Compression;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The compiled database binding that must be present in the build tree.
///
/// The harness is useless against the target cluster without it, so packaging
/// a tree that has not been built is refused outright.
const BINDING_ARTIFACT_GLOB: &str = "db/target/db-binding-*.jar";

/// File name of the produced archive.
pub const ARCHIVE_NAME: &str = "harness.tar.gz";

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("could not find a compiled binding matching {pattern} under {tree}")]
    MissingBindingArtifact { tree: PathBuf, pattern: String },
    #[error("invalid binding artifact pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Package the harness build tree into a gzip-compressed tar archive.
///
/// The archive is rooted at the build tree and written to a fresh scratch
/// directory, which is kept for the lifetime of the run. Safe to call once per
/// run and reuse the result across every client host; the output for an
/// unchanged tree is identical apart from timestamps.
pub fn package(build_tree: &Path) -> Result<PathBuf, PackageError> {
    ensure_binding_artifact(build_tree)?;

    let scratch = tempfile::tempdir()?.keep();
    let archive_path = scratch.join(ARCHIVE_NAME);

    let file = std::fs::File::create(&archive_path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(".", build_tree)?;
    builder.into_inner()?.finish()?;

    log::info!(
        "Packaged harness distribution from {} at {}",
        build_tree.display(),
        archive_path.display()
    );

    Ok(archive_path)
}

fn ensure_binding_artifact(build_tree: &Path) -> Result<(), PackageError> {
    let pattern = build_tree.join(BINDING_ARTIFACT_GLOB);
    let pattern = pattern.to_string_lossy();

    let found = glob::glob(&pattern)?.any(|entry| entry.is_ok());
    if !found {
        return Err(PackageError::MissingBindingArtifact {
            tree: build_tree.to_path_buf(),
            pattern: BINDING_ARTIFACT_GLOB.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use pretty_assertions::assert_eq;
    use std::io::Read;

    fn fake_build_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("db/target")).unwrap();
        std::fs::write(
            dir.path().join("db/target/db-binding-0.1.0.jar"),
            b"jar bytes",
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/ycsb"), b"#!/bin/sh\n").unwrap();
        dir
    }

    fn archive_entries(archive: &Path) -> Vec<(String, Vec<u8>)> {
        let file = std::fs::File::open(archive).unwrap();
        let mut tar = tar::Archive::new(GzDecoder::new(file));

        let mut entries = tar
            .entries()
            .unwrap()
            .map(|entry| {
                let mut entry = entry.unwrap();
                let name = entry.path().unwrap().to_string_lossy().into_owned();
                let mut contents = Vec::new();
                entry.read_to_end(&mut contents).unwrap();
                (name, contents)
            })
            .collect::<Vec<_>>();
        entries.sort();
        entries
    }

    #[test]
    fn refuses_a_tree_without_the_binding_artifact() {
        let dir = tempfile::tempdir().unwrap();

        let err = package(dir.path()).unwrap_err();

        assert!(matches!(err, PackageError::MissingBindingArtifact { .. }));
    }

    #[test]
    fn packages_the_whole_tree() {
        let tree = fake_build_tree();

        let archive = package(tree.path()).unwrap();
        let entries = archive_entries(&archive);
        let names = entries.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>();

        assert!(names.contains(&"./db/target/db-binding-0.1.0.jar"));
        assert!(names.contains(&"./bin/ycsb"));
    }

    #[test]
    fn packaging_an_unchanged_tree_is_idempotent() {
        let tree = fake_build_tree();

        let first = package(tree.path()).unwrap();
        let second = package(tree.path()).unwrap();

        assert_ne!(first, second);
        assert_eq!(archive_entries(&first), archive_entries(&second));
    }
}
