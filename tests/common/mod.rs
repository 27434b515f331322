//! Shared fixtures for the integration tests: scratch source trees and fake
//! compilers.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Writes `contents` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &[u8]) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

/// Fills `<source_dir>/precompiled/<relative>` for each relative artifact
/// path, with the path itself as contents.
pub fn precompile(source_dir: &Path, relatives: &[&str]) {
    for relative in relatives {
        write_file(
            &source_dir.join("precompiled"),
            relative,
            format!("precompiled {relative}").as_bytes(),
        );
    }
}

/// Every file under `root`, relative and with forward slashes, sorted.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    files.sort();
    files
}

/// Shell script compiler that writes its own argument list to the file after
/// `-o`, `-Fo` or `/Fo`.
#[cfg(unix)]
pub const RECORDING_COMPILER: &str = r#"#!/bin/sh
all="$*"
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o|-Fo|/Fo) out="$2"; shift ;;
  esac
  shift
done
[ -n "$out" ] || exit 0
printf '%s\n' "$all" > "$out"
"#;

/// Shell script compiler that always fails with a diagnostic on stderr.
#[cfg(unix)]
pub const FAILING_COMPILER: &str = r#"#!/bin/sh
echo "compiling..."
echo "overlay_frag.glsl:3: error: 'undeclared' : undeclared identifier" >&2
exit 2
"#;

/// Installs an executable script `dir/name`.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, script).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    wait_until_runnable(&path);
    path
}

/// A freshly written script can briefly report "text file busy" while a
/// concurrently forked test process still holds the write descriptor.
#[cfg(unix)]
fn wait_until_runnable(path: &Path) {
    for _ in 0..100 {
        match std::process::Command::new(path).output() {
            Err(err) if err.raw_os_error() == Some(26) => {
                std::thread::sleep(std::time::Duration::from_millis(10));
            }
            _ => return,
        }
    }
}
