//! Local state scanner.
//!
//! Walks a project directory and maps `(video, language)` to the subtitle
//! file that holds it. Two layouts are recognized at once:
//!
//! 1. Nested: `<root>/<videoId>/<language>.srt`, where `<videoId>` names a
//!    video already in the project.
//! 2. Flat (legacy): `<videoId>_<language>.srt` anywhere else under the
//!    root, split on the last underscore so ids may contain underscores.
//!
//! A nested match always wins over a flat match for the same pair; the flat
//! file is dropped silently. Malformed flat names are logged and skipped.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use subsync_core::types::{LanguageCode, ProjectFile, VideoId};

use crate::error::{io_err, SyncError};

pub const SUBTITLE_EXTENSION: &str = "srt";

/// Which naming convention a file was matched under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    Nested,
    Flat,
}

/// One subtitle file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
    pub convention: Convention,
}

/// A file the scanner saw but could not attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Scanner output: read-only input to the reconciler.
#[derive(Debug, Clone, Default)]
pub struct LocalScan {
    pub files: BTreeMap<(VideoId, LanguageCode), LocalFile>,
    pub skipped: Vec<SkippedFile>,
}

impl LocalScan {
    pub fn get(&self, video_id: &VideoId, language: &LanguageCode) -> Option<&LocalFile> {
        self.files.get(&(video_id.clone(), language.clone()))
    }
}

/// Split a flat `<videoId>_<language>` stem on its last underscore.
///
/// Returns `None` when there is no underscore or either side is empty.
pub fn parse_flat_stem(stem: &str) -> Option<(VideoId, LanguageCode)> {
    let (video, language) = stem.rsplit_once('_')?;
    if video.is_empty() || language.trim().is_empty() {
        return None;
    }
    Some((VideoId::from(video), LanguageCode::new(language)))
}

/// Scan `root` for subtitle files belonging to videos in `project`.
pub fn scan(root: &Path, project: &ProjectFile) -> Result<LocalScan, SyncError> {
    let mut nested = BTreeMap::new();
    let mut flat = BTreeMap::new();
    let mut skipped = Vec::new();

    for entry in sorted_entries(root)? {
        let path = entry;
        if path.is_dir() {
            let name = file_name(&path);
            if project.contains_video(&name) {
                scan_video_dir(&path, VideoId::from(name), &mut nested)?;
            } else {
                scan_flat_tree(&path, project, &mut flat, &mut skipped)?;
            }
        } else if is_subtitle(&path) {
            consider_flat(&path, project, &mut flat, &mut skipped)?;
        }
    }

    for (key, file) in flat {
        if nested.contains_key(&key) {
            tracing::debug!(
                "{} shadowed by nested file for {}/{}",
                file.path.display(),
                key.0,
                key.1
            );
            continue;
        }
        nested.insert(key, file);
    }

    Ok(LocalScan {
        files: nested,
        skipped,
    })
}

fn scan_video_dir(
    dir: &Path,
    video_id: VideoId,
    out: &mut BTreeMap<(VideoId, LanguageCode), LocalFile>,
) -> Result<(), SyncError> {
    for path in sorted_entries(dir)? {
        if !path.is_file() || !is_subtitle(&path) {
            continue;
        }
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let language = LanguageCode::new(&stem);
        let key = (video_id.clone(), language);
        if out.contains_key(&key) {
            tracing::warn!(
                "{}: another file in {} already provides '{}'",
                path.display(),
                dir.display(),
                key.1
            );
            continue;
        }
        let modified = modified_at(&path)?;
        out.insert(
            key,
            LocalFile {
                path,
                modified,
                convention: Convention::Nested,
            },
        );
    }
    Ok(())
}

fn scan_flat_tree(
    dir: &Path,
    project: &ProjectFile,
    out: &mut BTreeMap<(VideoId, LanguageCode), LocalFile>,
    skipped: &mut Vec<SkippedFile>,
) -> Result<(), SyncError> {
    for path in sorted_entries(dir)? {
        if path.is_dir() {
            scan_flat_tree(&path, project, out, skipped)?;
        } else if is_subtitle(&path) {
            consider_flat(&path, project, out, skipped)?;
        }
    }
    Ok(())
}

fn consider_flat(
    path: &Path,
    project: &ProjectFile,
    out: &mut BTreeMap<(VideoId, LanguageCode), LocalFile>,
    skipped: &mut Vec<SkippedFile>,
) -> Result<(), SyncError> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let Some((video_id, language)) = parse_flat_stem(&stem) else {
        skip(skipped, path, "expected <videoId>_<language>.srt");
        return Ok(());
    };
    if !project.videos.contains_key(&video_id) {
        skip(
            skipped,
            path,
            &format!("video '{video_id}' is not part of this project"),
        );
        return Ok(());
    }
    let key = (video_id, language);
    if out.contains_key(&key) {
        skip(skipped, path, "duplicate flat file for the same video and language");
        return Ok(());
    }
    let modified = modified_at(path)?;
    out.insert(
        key,
        LocalFile {
            path: path.to_path_buf(),
            modified,
            convention: Convention::Flat,
        },
    );
    Ok(())
}

fn skip(skipped: &mut Vec<SkippedFile>, path: &Path, reason: &str) {
    tracing::warn!("skipping {}: {reason}", path.display());
    skipped.push(SkippedFile {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    });
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let read = match std::fs::read_dir(dir) {
        Ok(read) => read,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
        Err(err) => return Err(io_err(dir, err)),
    };
    let mut paths: Vec<PathBuf> = read.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    paths.sort();
    Ok(paths)
}

fn is_subtitle(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(SUBTITLE_EXTENSION))
        .unwrap_or(false)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn modified_at(path: &Path) -> Result<DateTime<Utc>, SyncError> {
    let meta = std::fs::metadata(path).map_err(|e| io_err(path, e))?;
    let mtime = meta.modified().map_err(|e| io_err(path, e))?;
    Ok(DateTime::<Utc>::from(mtime))
}
