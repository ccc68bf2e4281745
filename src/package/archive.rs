// ABOUTME: Gzip-compressed tar archive builder for collected files.
// ABOUTME: Strips the package root from entry names and keeps symlinks and file modes.

use std::fs::File;
use std::io::Write;
use std::path::{Component, Path};

use flate2::Compression;
use flate2::write::GzEncoder;
use snafu::ResultExt;
use tar::{Builder, EntryType, Header, HeaderMode};

use super::collect::FileManifest;
use super::error::{
    FinishSnafu, MetadataSnafu, OpenSnafu, PackageError, ReadLinkSnafu, WriteEntrySnafu,
};

/// Directory whose entries must stay executable after extraction.
pub const EXECUTABLE_SCRIPTS_DIR: &str = "node_modules/.bin";

/// Write a `.tar.gz` of every manifest entry into `sink`.
///
/// Entry names are relative to the manifest root and always use `/`, so the
/// application lands at the archive root no matter where the tool was run
/// from. The tar and gzip writers are both finished before the sink is
/// handed back, so its length is final when this returns.
///
/// # Errors
///
/// Aborts on the first entry that cannot be read or written.
pub fn build<W: Write>(manifest: &FileManifest, sink: W) -> Result<W, PackageError> {
    let encoder = GzEncoder::new(sink, Compression::default());
    let mut builder = Builder::new(encoder);
    builder.follow_symlinks(false);

    let root = manifest.root();
    for path in manifest.entries() {
        append_entry(&mut builder, root, path)?;
    }

    let encoder = builder.into_inner().context(FinishSnafu)?;
    encoder.finish().context(FinishSnafu)
}

/// Archive name for `path`: relative to `root`, joined with forward slashes.
///
/// # Errors
///
/// Returns `PackageError::OutsideRoot` if `path` is not below `root`.
pub fn entry_name(root: &Path, path: &Path) -> Result<String, PackageError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| PackageError::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })?;

    let segments: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(segment) => Some(segment.to_string_lossy()),
            _ => None,
        })
        .collect();

    if segments.is_empty() {
        return Err(PackageError::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        });
    }

    Ok(segments.join("/"))
}

fn append_entry<W: Write>(
    builder: &mut Builder<W>,
    root: &Path,
    path: &Path,
) -> Result<(), PackageError> {
    let name = entry_name(root, path)?;
    // lstat, so symlinks are archived as links rather than their targets.
    let metadata = std::fs::symlink_metadata(path).context(MetadataSnafu { path })?;

    let mut header = Header::new_gnu();
    header.set_metadata_in_mode(&metadata, HeaderMode::Complete);
    restore_exec_mode(&mut header, &name, cfg!(windows));

    let file_type = metadata.file_type();
    if file_type.is_symlink() {
        let target = std::fs::read_link(path).context(ReadLinkSnafu { path })?;
        header.set_entry_type(EntryType::Symlink);
        header.set_size(0);
        builder
            .append_link(&mut header, &name, &target)
            .context(WriteEntrySnafu { path })?;
    } else if file_type.is_dir() {
        header.set_entry_type(EntryType::Directory);
        header.set_size(0);
        builder
            .append_data(&mut header, &name, std::io::empty())
            .context(WriteEntrySnafu { path })?;
    } else {
        let file = File::open(path).context(OpenSnafu { path })?;
        builder
            .append_data(&mut header, &name, file)
            .context(WriteEntrySnafu { path })?;
    }

    Ok(())
}

/// Force 0755 on script shims when the host filesystem has no exec bit.
///
/// The platform always unpacks on POSIX and runs `node_modules/.bin` entries
/// directly, so archives built on Windows must carry the bit explicitly.
fn restore_exec_mode(header: &mut Header, name: &str, host_lacks_exec_bit: bool) {
    if host_lacks_exec_bit && name.contains(EXECUTABLE_SCRIPTS_DIR) {
        header.set_mode(0o755);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{ExcludePatterns, collect};
    use flate2::read::GzDecoder;
    use std::fs;
    use std::io::Read;

    fn unpack_names(bytes: &[u8]) -> Vec<(String, EntryType)> {
        let mut archive = tar::Archive::new(GzDecoder::new(bytes));
        archive
            .entries()
            .unwrap()
            .map(|e| {
                let e = e.unwrap();
                (
                    e.path().unwrap().to_string_lossy().into_owned(),
                    e.header().entry_type(),
                )
            })
            .collect()
    }

    #[test]
    fn entry_names_are_relative_with_forward_slashes() {
        let root = Path::new("/srv/app");
        assert_eq!(
            entry_name(root, &root.join("src").join("index.js")).unwrap(),
            "src/index.js"
        );
        assert!(entry_name(root, Path::new("/srv/other/x")).is_err());
        assert!(entry_name(root, root).is_err());
    }

    #[test]
    fn archive_contains_files_at_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{\"name\":\"app\"}").unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/a.js"), "module.exports = 1").unwrap();

        let manifest = collect(dir.path(), &ExcludePatterns::default()).unwrap();
        let bytes = build(&manifest, Vec::new()).unwrap();

        let entries = unpack_names(&bytes);
        assert_eq!(
            entries,
            vec![
                ("lib".to_string(), EntryType::Directory),
                ("lib/a.js".to_string(), EntryType::Regular),
                ("package.json".to_string(), EntryType::Regular),
            ]
        );

        let mut archive = tar::Archive::new(GzDecoder::new(bytes.as_slice()));
        let mut contents = String::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            if entry.path().unwrap().ends_with("package.json") {
                entry.read_to_string(&mut contents).unwrap();
            }
        }
        assert_eq!(contents, "{\"name\":\"app\"}");
    }

    #[test]
    fn unchanged_tree_produces_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("server.js"), "listen()").unwrap();

        let manifest = collect(dir.path(), &ExcludePatterns::default()).unwrap();
        let first = build(&manifest, Vec::new()).unwrap();
        let second = build(&manifest, Vec::new()).unwrap();
        assert_eq!(first, second);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_preserved_and_modes_kept() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("run.sh"), "#!/bin/sh").unwrap();
        fs::set_permissions(dir.path().join("run.sh"), fs::Permissions::from_mode(0o750))
            .unwrap();
        std::os::unix::fs::symlink("run.sh", dir.path().join("start")).unwrap();

        let manifest = collect(dir.path(), &ExcludePatterns::default()).unwrap();
        let bytes = build(&manifest, Vec::new()).unwrap();

        let mut archive = tar::Archive::new(GzDecoder::new(bytes.as_slice()));
        let mut saw_link = false;
        for entry in archive.entries().unwrap() {
            let entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().into_owned();
            match path.as_str() {
                "start" => {
                    saw_link = true;
                    assert_eq!(entry.header().entry_type(), EntryType::Symlink);
                    assert_eq!(
                        entry.link_name().unwrap().unwrap().to_string_lossy(),
                        "run.sh"
                    );
                }
                "run.sh" => assert_eq!(entry.header().mode().unwrap() & 0o777, 0o750),
                other => panic!("unexpected entry {other}"),
            }
        }
        assert!(saw_link);
    }

    #[test]
    fn exec_mode_forced_only_for_script_dir_when_host_lacks_bit() {
        let mut header = Header::new_gnu();
        header.set_mode(0o644);

        restore_exec_mode(&mut header, "node_modules/.bin/next", false);
        assert_eq!(header.mode().unwrap(), 0o644);

        restore_exec_mode(&mut header, "lib/node_modules.txt", true);
        assert_eq!(header.mode().unwrap(), 0o644);

        restore_exec_mode(&mut header, "node_modules/.bin/next", true);
        assert_eq!(header.mode().unwrap(), 0o755);
    }
}
