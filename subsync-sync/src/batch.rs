//! CSV batch processing and export.
//!
//! The "long" CSV has one row per caption:
//!
//! ```text
//! video_id,video_title,caption_id,language,action,file_path
//! ```
//!
//! [`export_captions_csv`] writes it with empty `action` cells; the user fills
//! in `UPLOAD`, `UPDATE` or `DELETE` and feeds it back to [`process_batch`].
//!
//! [`export_wide_report`] writes a read-only "wide" view instead: one row per
//! video and one `caption_id_<language>` column per language seen.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use subsync_core::types::{CaptionId, LanguageCode, VideoId};

use crate::error::{ExecError, SyncError};
use crate::executor::Executor;
use crate::pipeline::ActionStatus;
use crate::quota::{Confirm, PlannedCounts, QuotaMeter};
use crate::reconcile::{Action, Payload};
use crate::remote::VideoSummary;
use crate::session::RemoteSession;

/// `caption_id` written when a video's captions could not be listed.
pub const ERROR_FETCHING: &str = "ERROR_FETCHING";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRow {
    pub video_id: String,
    #[serde(default)]
    pub video_title: String,
    #[serde(default)]
    pub caption_id: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub file_path: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    pub dry_run: bool,
}

/// Outcome of one CSV row. `line` is the 1-based line in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRowReport {
    pub line: usize,
    pub video_id: String,
    pub action: String,
    pub status: ActionStatus,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub rows: Vec<BatchRowReport>,
    pub aborted: bool,
    pub estimated_cost: u64,
}

impl BatchReport {
    pub fn failures(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| matches!(r.status, ActionStatus::Failed(_)))
            .count()
    }
}

enum Planned {
    Run(Action),
    Reject(ActionStatus),
}

fn plan_row(row: &BatchRow, action: &str) -> Planned {
    let video_id = VideoId::from(row.video_id.trim());
    let language = LanguageCode::new(&row.language);
    let file_path = row.file_path.trim();
    let caption_id = Some(row.caption_id.trim())
        .filter(|id| !id.is_empty() && *id != ERROR_FETCHING)
        .map(CaptionId::from);

    if video_id.as_str().is_empty() {
        return Planned::Reject(ActionStatus::Failed("missing video_id".into()));
    }
    let needs_file = matches!(action, "UPLOAD" | "UPDATE");
    if needs_file && (file_path.is_empty() || language.as_str().is_empty()) {
        return Planned::Reject(ActionStatus::Failed(
            "UPLOAD and UPDATE need both language and file_path".into(),
        ));
    }

    let payload = match action {
        "UPLOAD" => Payload::Upload {
            local_path: PathBuf::from(file_path),
        },
        "UPDATE" => Payload::Update {
            local_path: PathBuf::from(file_path),
            caption_id,
        },
        "DELETE" => match caption_id {
            Some(id) => Payload::Delete {
                caption_id: Some(id),
            },
            None => {
                let err = ExecError::MissingCaptionId {
                    video_id: video_id.to_string(),
                    language: language.to_string(),
                };
                return Planned::Reject(ActionStatus::Failed(err.to_string()));
            }
        },
        other => {
            return Planned::Reject(ActionStatus::Skipped(format!("unknown action '{other}'")))
        }
    };
    Planned::Run(Action {
        video_id,
        language,
        payload,
    })
}

/// Run every row of `input` that names an action.
///
/// Rows with an empty `action` are ignored. Each row is reported on its
/// own; a failing row never stops the batch, except for an authentication
/// failure, which is returned as [`SyncError::Auth`].
pub fn process_batch<R: Read>(
    input: R,
    session: &mut RemoteSession<'_>,
    opts: BatchOptions,
    confirm: &mut dyn Confirm,
) -> Result<BatchReport, SyncError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
    let mut planned = Vec::new();

    for (i, record) in reader.deserialize::<BatchRow>().enumerate() {
        let line = i + 2;
        let row = match record {
            Ok(row) => row,
            Err(err) => {
                tracing::warn!("line {line}: {err}");
                planned.push((
                    line,
                    String::new(),
                    String::new(),
                    Planned::Reject(ActionStatus::Failed(format!("unreadable row: {err}"))),
                ));
                continue;
            }
        };
        let action = row.action.trim().to_uppercase();
        if action.is_empty() {
            continue;
        }
        let plan = plan_row(&row, &action);
        planned.push((line, row.video_id.clone(), action, plan));
    }

    let mut counts = PlannedCounts::default();
    for (_, _, _, plan) in &planned {
        if let Planned::Run(action) = plan {
            match action.payload {
                Payload::Upload { .. } => counts.uploads += 1,
                Payload::Update { .. } => counts.updates += 1,
                Payload::Delete { .. } => counts.deletes += 1,
            }
        }
    }

    let mut report = BatchReport {
        estimated_cost: QuotaMeter::estimate(counts),
        ..BatchReport::default()
    };
    if planned.is_empty() {
        tracing::warn!("no actions found in the CSV");
        return Ok(report);
    }
    if !opts.dry_run && !session.meter().preflight(counts, confirm) {
        report.aborted = true;
        return Ok(report);
    }

    let executor = Executor::new(opts.dry_run);
    for (line, video_id, action_name, plan) in planned {
        let status = match plan {
            Planned::Reject(status) => status,
            Planned::Run(action) => match executor.execute(session, &action) {
                Ok(outcome) => ActionStatus::Applied(outcome),
                Err(ExecError::Remote(err)) if err.is_auth_failure() => {
                    return Err(SyncError::Auth(err));
                }
                Err(err) => ActionStatus::Failed(err.to_string()),
            },
        };
        match &status {
            ActionStatus::Failed(detail) => tracing::error!("line {line}: {detail}"),
            ActionStatus::Skipped(detail) => tracing::warn!("line {line}: {detail}"),
            ActionStatus::Applied(_) => {}
        }
        report.rows.push(BatchRowReport {
            line,
            video_id,
            action: action_name,
            status,
        });
    }
    Ok(report)
}

/// Write the long CSV for `videos`. Returns the number of data rows.
pub fn export_captions_csv<W: Write>(
    videos: &[VideoSummary],
    session: &mut RemoteSession<'_>,
    out: W,
) -> Result<usize, SyncError> {
    let mut writer = csv::Writer::from_writer(out);
    let mut rows = 0;

    for (i, video) in videos.iter().enumerate() {
        tracing::info!("[{}/{}] {}", i + 1, videos.len(), video.id);
        let base = BatchRow {
            video_id: video.id.to_string(),
            video_title: video.title.clone(),
            ..BatchRow::default()
        };
        match session.list_captions(&video.id) {
            Ok(captions) if captions.is_empty() => {
                writer.serialize(&base)?;
                rows += 1;
            }
            Ok(captions) => {
                for (idx, caption) in captions.iter().enumerate() {
                    writer.serialize(BatchRow {
                        video_title: if idx == 0 { video.title.clone() } else { String::new() },
                        caption_id: caption.id.to_string(),
                        language: caption.language.clone(),
                        ..base.clone()
                    })?;
                    rows += 1;
                }
            }
            Err(err) => {
                tracing::warn!("could not list captions for {}: {err}", video.id);
                writer.serialize(BatchRow {
                    caption_id: ERROR_FETCHING.to_string(),
                    ..base
                })?;
                rows += 1;
            }
        }
    }
    writer
        .flush()
        .map_err(|e| SyncError::Csv(csv::Error::from(e)))?;
    Ok(rows)
}

/// Write the wide report for `videos`. Returns the number of data rows.
///
/// Language columns are sorted. A video whose captions cannot be listed keeps
/// its row with every language cell empty.
pub fn export_wide_report<W: Write>(
    videos: &[VideoSummary],
    session: &mut RemoteSession<'_>,
    out: W,
) -> Result<usize, SyncError> {
    let mut languages = BTreeSet::new();
    let mut rows: Vec<(&VideoSummary, BTreeMap<String, String>)> = Vec::new();

    for (i, video) in videos.iter().enumerate() {
        tracing::info!("[{}/{}] {}", i + 1, videos.len(), video.id);
        let mut cells = BTreeMap::new();
        match session.list_captions(&video.id) {
            Ok(captions) => {
                for caption in captions {
                    languages.insert(caption.language.clone());
                    cells.insert(caption.language, caption.id.to_string());
                }
            }
            Err(err) => tracing::warn!("could not list captions for {}: {err}", video.id),
        }
        rows.push((video, cells));
    }

    let mut writer = csv::Writer::from_writer(out);
    let mut header = vec!["video_id".to_string(), "video_title".to_string()];
    header.extend(languages.iter().map(|lang| format!("caption_id_{lang}")));
    writer.write_record(&header)?;
    for (video, cells) in &rows {
        let mut record = vec![video.id.to_string(), video.title.clone()];
        record.extend(
            languages
                .iter()
                .map(|lang| cells.get(lang).cloned().unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }
    writer
        .flush()
        .map_err(|e| SyncError::Csv(csv::Error::from(e)))?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use crate::executor::Outcome;
    use crate::remote::RemoteError;
    use crate::testing::FakeService;
    use chrono::Duration;
    use tempfile::TempDir;

    fn cache(tmp: &TempDir) -> ResponseCache {
        ResponseCache::new(tmp.path().join("cache"), Duration::hours(1))
    }

    fn header() -> &'static str {
        "video_id,video_title,caption_id,language,action,file_path\n"
    }

    #[test]
    fn rows_run_independently_and_unknown_actions_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let srt = tmp.path().join("v1_en.srt");
        std::fs::write(&srt, "1\n").unwrap();
        let csv_text = format!(
            "{}v1,Title,, en , upload ,{}\nv1,,c-gone,fr,DELETE,\nv1,,,de,,\nv2,,,,frobnicate,\nv1,,,ja,UPDATE,{}\n",
            header(),
            srt.display(),
            tmp.path().join("missing.srt").display(),
        );
        let cache = cache(&tmp);
        let service = FakeService::new();
        service.fail_next(
            "delete",
            RemoteError::Status {
                code: 500,
                message: "boom".into(),
            },
        );
        let mut meter = QuotaMeter::default();
        let mut session = RemoteSession::new(&service, &cache, &mut meter);

        let report = process_batch(
            csv_text.as_bytes(),
            &mut session,
            BatchOptions::default(),
            &mut |_: &str| true,
        )
        .unwrap();

        // The row with an empty action is ignored entirely.
        let lines: Vec<usize> = report.rows.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![2, 3, 5, 6]);
        assert!(matches!(report.rows[0].status, ActionStatus::Applied(Outcome::Uploaded(_))));
        assert!(matches!(report.rows[1].status, ActionStatus::Failed(_)));
        assert!(matches!(report.rows[2].status, ActionStatus::Skipped(_)));
        assert!(matches!(report.rows[3].status, ActionStatus::Failed(_)));
        assert_eq!(report.failures(), 2);
        assert_eq!(report.estimated_cost, 400 + 50 + 450);
    }

    #[test]
    fn delete_without_caption_id_fails_the_row() {
        let tmp = TempDir::new().unwrap();
        let csv_text = format!("{}v1,,,en,delete,\n", header());
        let cache = cache(&tmp);
        let service = FakeService::new();
        let mut meter = QuotaMeter::default();
        let mut session = RemoteSession::new(&service, &cache, &mut meter);

        let report = process_batch(
            csv_text.as_bytes(),
            &mut session,
            BatchOptions::default(),
            &mut |_: &str| true,
        )
        .unwrap();

        assert!(matches!(&report.rows[0].status, ActionStatus::Failed(d) if d.contains("no caption id")));
        assert!(service.calls().is_empty());
    }

    #[test]
    fn refusal_runs_nothing() {
        let tmp = TempDir::new().unwrap();
        let csv_text = format!("{}v1,,c1,en,DELETE,\n", header());
        let cache = cache(&tmp);
        let service = FakeService::new().with_caption("v1", "c1", "en");
        let mut meter = QuotaMeter::default();
        let mut session = RemoteSession::new(&service, &cache, &mut meter);

        let report = process_batch(
            csv_text.as_bytes(),
            &mut session,
            BatchOptions::default(),
            &mut |_: &str| false,
        )
        .unwrap();

        assert!(report.aborted);
        assert!(report.rows.is_empty());
        assert_eq!(service.mutation_calls(), 0);
        assert_eq!(meter.total_spent(), 0);
    }

    #[test]
    fn export_writes_long_format() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let service = FakeService::new()
            .with_caption("v1", "c-en", "en")
            .with_caption("v1", "c-de", "de");
        service.fail_next(
            "list",
            RemoteError::Status {
                code: 403,
                message: "forbidden".into(),
            },
        );
        let mut meter = QuotaMeter::default();
        let mut session = RemoteSession::new(&service, &cache, &mut meter);
        let videos = vec![
            VideoSummary {
                id: VideoId::from("v0"),
                title: "Broken".into(),
            },
            VideoSummary {
                id: VideoId::from("v1"),
                title: "One".into(),
            },
            VideoSummary {
                id: VideoId::from("v2"),
                title: "Two".into(),
            },
        ];

        let mut out = Vec::new();
        let rows = export_captions_csv(&videos, &mut session, &mut out).unwrap();

        assert_eq!(rows, 4);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], header().trim_end());
        assert_eq!(lines[1], "v0,Broken,ERROR_FETCHING,,,");
        assert_eq!(lines[2], "v1,One,c-en,en,,");
        assert_eq!(lines[3], "v1,,c-de,de,,");
        assert_eq!(lines[4], "v2,Two,,,,");
    }

    #[test]
    fn wide_report_has_one_sorted_column_per_language() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let service = FakeService::new()
            .with_caption("v1", "c-fr", "fr-FR")
            .with_caption("v1", "c-en", "en")
            .with_caption("v2", "c2-de", "de-DE");
        service.fail_next(
            "list",
            RemoteError::Status {
                code: 403,
                message: "forbidden".into(),
            },
        );
        let mut meter = QuotaMeter::default();
        let mut session = RemoteSession::new(&service, &cache, &mut meter);
        let videos: Vec<VideoSummary> = [("v0", "Broken"), ("v1", "One"), ("v2", "Two")]
            .iter()
            .map(|(id, title)| VideoSummary {
                id: VideoId::from(*id),
                title: title.to_string(),
            })
            .collect();

        let mut out = Vec::new();
        let rows = export_wide_report(&videos, &mut session, &mut out).unwrap();

        assert_eq!(rows, 3);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "video_id,video_title,caption_id_de-DE,caption_id_en,caption_id_fr-FR",
                "v0,Broken,,,",
                "v1,One,,c-en,c-fr",
                "v2,Two,c2-de,,",
            ]
        );
    }
}
