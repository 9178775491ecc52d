//! Tar archives for copying host files into a device.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{HarnessError, Result};

/// An in-memory tar ready to be unpacked into `directory` on the device.
#[derive(Debug)]
pub struct TransferArchive {
    pub bytes: Vec<u8>,
    pub directory: String,
    pub files: usize,
}

fn has_glob(part: &str) -> bool {
    part.contains(['*', '?', '['])
}

/// Leading path components of `pattern` that contain no glob characters.
pub fn base_dir(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for component in Path::new(pattern).components() {
        let globbed = matches!(component, Component::Normal(part) if has_glob(&part.to_string_lossy()));
        if globbed {
            break;
        }
        base.push(component);
    }
    base
}

/// Directory the archive is unpacked into.
///
/// Several files, or a `dst` ending in `/`, go into `dst` itself; a single
/// file goes into the parent of `dst`.
pub fn destination_dir(dst: &str, files: usize) -> String {
    if files > 1 || dst.ends_with('/') {
        format!("{}/", dst.trim_end_matches('/'))
    } else {
        match Path::new(dst).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_string_lossy().to_string(),
            _ => "/".to_string(),
        }
    }
}

/// Archive every match of `src` for extraction at `dst`.
pub fn build(src: &str, dst: &str) -> Result<TransferArchive> {
    let matches = glob::glob(src)
        .map_err(|e| HarnessError::InvalidArgument(format!("bad source pattern {src}: {e}")))?
        .collect::<std::result::Result<Vec<PathBuf>, _>>()
        .map_err(|e| HarnessError::Io(e.into()))?;

    if matches.is_empty() {
        return Err(HarnessError::InvalidArgument(format!(
            "no files match {src}"
        )));
    }

    let base = base_dir(src);
    let directory = destination_dir(dst, matches.len());

    let mut builder = tar::Builder::new(Vec::new());
    for path in &matches {
        // entries keep their path below the pattern's base, a plain file its own name
        let archive_path = match path.strip_prefix(&base) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative.to_path_buf(),
            _ => path.file_name().map(PathBuf::from).ok_or_else(|| {
                HarnessError::InvalidArgument(format!("cannot archive {}", path.display()))
            })?,
        };
        debug!(
            "Adding file: path={}, archive_path={}",
            path.display(),
            archive_path.display()
        );
        if path.is_dir() {
            builder.append_dir_all(&archive_path, path)?;
        } else {
            builder.append_path_with_name(path, &archive_path)?;
        }
    }

    Ok(TransferArchive {
        bytes: builder.into_inner()?,
        directory,
        files: matches.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    fn entries(bytes: &[u8]) -> Vec<String> {
        let mut archive = tar::Archive::new(Cursor::new(bytes));
        let mut names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_base_dir_stops_at_glob() {
        assert_eq!(base_dir("/tmp/files/*.toml"), PathBuf::from("/tmp/files"));
        assert_eq!(base_dir("plugins/*/bin/x"), PathBuf::from("plugins"));
        assert_eq!(base_dir("/etc/tedge/tedge.toml"), PathBuf::from("/etc/tedge/tedge.toml"));
    }

    #[test]
    fn test_destination_dir() {
        assert_eq!(destination_dir("/etc/tedge/tedge.toml", 1), "/etc/tedge");
        assert_eq!(destination_dir("/etc/tedge/", 1), "/etc/tedge/");
        assert_eq!(destination_dir("/etc/tedge/plugins", 3), "/etc/tedge/plugins/");
        assert_eq!(destination_dir("file.txt", 1), "/");
    }

    #[test]
    fn test_build_multiple_files_relative_to_base() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.toml"), "a = 1").unwrap();
        fs::write(dir.path().join("b.toml"), "b = 2").unwrap();
        fs::write(dir.path().join("c.txt"), "c").unwrap();

        let pattern = format!("{}/*.toml", dir.path().display());
        let archive = build(&pattern, "/etc/tedge/plugins").unwrap();

        assert_eq!(archive.files, 2);
        assert_eq!(archive.directory, "/etc/tedge/plugins/");
        assert_eq!(entries(&archive.bytes), vec!["a.toml", "b.toml"]);
    }

    #[test]
    fn test_build_single_file_keeps_its_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("local.toml");
        fs::write(&file, "x = 1").unwrap();

        let archive = build(&file.to_string_lossy(), "/etc/tedge/tedge.toml").unwrap();
        assert_eq!(archive.files, 1);
        assert_eq!(archive.directory, "/etc/tedge");
        assert_eq!(entries(&archive.bytes), vec!["local.toml"]);
    }

    #[test]
    fn test_build_single_glob_match_relative_to_base() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("plugins")).unwrap();
        fs::write(dir.path().join("plugins").join("dummy.log"), "line").unwrap();

        let pattern = format!("{}/*/dummy.log", dir.path().display());
        let archive = build(&pattern, "/var/log/").unwrap();
        assert_eq!(archive.directory, "/var/log/");
        assert_eq!(entries(&archive.bytes), vec!["plugins/dummy.log"]);
    }

    #[test]
    fn test_build_without_matches_fails() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.missing", dir.path().display());
        assert!(matches!(
            build(&pattern, "/tmp/"),
            Err(HarnessError::InvalidArgument(_))
        ));
    }
}
