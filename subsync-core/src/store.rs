//! Per-project JSON store.
//!
//! # Storage layout
//!
//! ```text
//! ~/.subsync/
//!   projects/
//!     <project_name>/
//!       project.json        (ProjectFile: mode 0600)
//!       <videoId>/          (one directory per video, nested convention)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{io_err, StoreError};
use crate::types::{ProjectFile, ProjectName};

pub const PROJECT_FILE: &str = "project.json";

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.subsync`
pub fn root_at(home: &Path) -> PathBuf {
    home.join(".subsync")
}

/// `<home>/.subsync/projects/`
pub fn projects_root_at(home: &Path) -> PathBuf {
    root_at(home).join("projects")
}

/// `<home>/.subsync/projects/<project>/`: pure, no I/O.
pub fn project_dir_at(home: &Path, project: &ProjectName) -> PathBuf {
    projects_root_at(home).join(&project.0)
}

/// `<home>/.subsync/projects/<project>/project.json`: pure, no I/O.
pub fn project_path_at(home: &Path, project: &ProjectName) -> PathBuf {
    project_dir_at(home, project).join(PROJECT_FILE)
}

/// Names of every project directory that holds a `project.json`, sorted.
pub fn list_projects_at(home: &Path) -> Result<Vec<ProjectName>, StoreError> {
    let dir = projects_root_at(home);
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut names: Vec<ProjectName> = std::fs::read_dir(&dir)
        .map_err(|e| io_err(&dir, e))?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|e| e.path().join(PROJECT_FILE).exists())
        .map(|e| ProjectName::from(e.file_name().to_string_lossy().into_owned()))
        .collect();
    names.sort();
    Ok(names)
}

/// `list_projects_at` convenience wrapper.
pub fn list_projects() -> Result<Vec<ProjectName>, StoreError> {
    list_projects_at(&home()?)
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load `<home>/.subsync/projects/<project>/project.json`.
///
/// Language keys are normalized on the way in; collisions keep the most
/// recently synced record and are logged.
///
/// Returns `StoreError::ProjectNotFound` if absent,
/// `StoreError::Parse` (with path) if malformed JSON.
pub fn load_at(home: &Path, project: &ProjectName) -> Result<ProjectFile, StoreError> {
    let path = project_path_at(home, project);
    if !path.exists() {
        return Err(StoreError::ProjectNotFound { path });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let mut file: ProjectFile =
        serde_json::from_str(&contents).map_err(|e| StoreError::Parse { path, source: e })?;

    for (video_id, state) in file.videos.iter_mut() {
        for code in state.normalize_languages() {
            tracing::warn!(
                "{video_id}: duplicate caption entries for '{code}'; kept the most recently synced"
            );
        }
    }
    Ok(file)
}

/// `load_at` convenience wrapper.
pub fn load(project: &ProjectName) -> Result<ProjectFile, StoreError> {
    load_at(&home()?, project)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically replace the project file.
///
/// Write flow: serialize → `project.json.tmp` sibling → `chmod 0600` → `rename`.
/// `.tmp` is always in the same directory as the target (same filesystem).
pub fn save_at(home: &Path, project: &ProjectFile) -> Result<(), StoreError> {
    let dir = project_dir_at(home, &project.name);
    std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
    let path = dir.join(PROJECT_FILE);
    let tmp_path = dir.join(format!("{PROJECT_FILE}.tmp"));

    let json = serde_json::to_string_pretty(project)?;
    std::fs::write(&tmp_path, json).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    if let Err(e) = std::fs::rename(&tmp_path, &path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(&path, e));
    }
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(project: &ProjectFile) -> Result<(), StoreError> {
    save_at(&home()?, project)
}

// ---------------------------------------------------------------------------
// 4. Create
// ---------------------------------------------------------------------------

/// Write a brand-new project, creating one directory per video for the
/// nested file convention.
///
/// Fails with `StoreError::ProjectExists` rather than overwriting.
pub fn create_at(home: &Path, project: &mut ProjectFile) -> Result<PathBuf, StoreError> {
    let dir = project_dir_at(home, &project.name);
    let path = dir.join(PROJECT_FILE);
    if path.exists() {
        return Err(StoreError::ProjectExists { path });
    }
    for video_id in project.videos.keys() {
        let video_dir = dir.join(&video_id.0);
        std::fs::create_dir_all(&video_dir).map_err(|e| io_err(&video_dir, e))?;
    }
    project.updated_at = Utc::now();
    save_at(home, project)?;
    Ok(dir)
}

/// `create_at` convenience wrapper.
pub fn create(project: &mut ProjectFile) -> Result<PathBuf, StoreError> {
    create_at(&home()?, project)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, StoreError> {
    dirs::home_dir().ok_or(StoreError::HomeNotFound)
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
