//! Reproducible `.tar.gz` archives of a source tree.
//!
//! Every member is owned by `root:root` (uid/gid 0) whoever runs the tool,
//! and member paths start with the source directory's own name.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use autofix_core::{OpsError, Result};
use chrono::NaiveDateTime;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, EntryType, Header};
use tracing::debug;

/// Prefix of every uploaded source archive.
pub const STORAGE_PREFIX: &str = "tmp/codefix/source";

const ROOT_NAME: &str = "root";

/// What was written.
#[derive(Debug, Clone)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub entries: usize,
    pub bytes: u64,
}

impl ArchiveSummary {
    pub fn size_mb(&self) -> f64 {
        self.bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Base name of the source directory.
pub fn repo_name(source: &Path) -> Result<String> {
    let name = match source.file_name() {
        Some(name) => name.to_os_string(),
        None => fs::canonicalize(source)?
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| {
                OpsError::InvalidConfig(format!("cannot name repository at {}", source.display()))
            })?,
    };
    Ok(name.to_string_lossy().into_owned())
}

/// Object key for an archive of `repo_name` built at `at` (second resolution).
pub fn storage_key(repo_name: &str, at: NaiveDateTime) -> String {
    format!(
        "{STORAGE_PREFIX}/{repo_name}-{}.tar.gz",
        at.format("%Y%m%d-%H%M%S")
    )
}

/// Write a gzip-compressed tar of `source` to `output`.
pub fn create_archive(source: &Path, output: &Path) -> Result<ArchiveSummary> {
    if !source.is_dir() {
        return Err(OpsError::NotFound(format!(
            "Repo path does not exist: {}",
            source.display()
        )));
    }
    let top = PathBuf::from(repo_name(source)?);

    let file = File::create(output)?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = Builder::new(encoder);
    builder.follow_symlinks(false);

    let mut entries = 0usize;
    append_tree(&mut builder, source, &top, &mut entries)?;

    let encoder = builder.into_inner()?;
    let mut writer = encoder.finish()?;
    io::Write::flush(&mut writer)?;
    drop(writer);

    let bytes = fs::metadata(output)?.len();
    debug!(path = %output.display(), entries, bytes, "archive written");
    Ok(ArchiveSummary {
        path: output.to_path_buf(),
        entries,
        bytes,
    })
}

/// Append the children of `dir` (not `dir` itself) under `prefix`.
fn append_tree<W: io::Write>(
    builder: &mut Builder<W>,
    dir: &Path,
    prefix: &Path,
    entries: &mut usize,
) -> Result<()> {
    let mut children: Vec<_> = fs::read_dir(dir)?.collect::<io::Result<_>>()?;
    children.sort_by_key(|e| e.file_name());

    for child in children {
        let path = child.path();
        let member = prefix.join(child.file_name());
        let meta = fs::symlink_metadata(&path)?;

        let mut header = Header::new_gnu();
        header.set_metadata(&meta);
        normalize_owner(&mut header)?;

        let file_type = meta.file_type();
        if file_type.is_symlink() {
            let target = fs::read_link(&path)?;
            header.set_entry_type(EntryType::Symlink);
            header.set_size(0);
            // Targets past the 100-byte header field go out as GNU long-link records.
            builder.append_link(&mut header, &member, &target)?;
        } else if file_type.is_dir() {
            builder.append_data(&mut header, &member, io::empty())?;
            *entries += 1;
            append_tree(builder, &path, &member, entries)?;
            continue;
        } else if file_type.is_file() {
            builder.append_data(&mut header, &member, File::open(&path)?)?;
        } else {
            debug!(path = %path.display(), "skipping special file");
            continue;
        }
        *entries += 1;
    }
    Ok(())
}

fn normalize_owner(header: &mut Header) -> Result<()> {
    header.set_uid(0);
    header.set_gid(0);
    header.set_username(ROOT_NAME)?;
    header.set_groupname(ROOT_NAME)?;
    Ok(())
}
