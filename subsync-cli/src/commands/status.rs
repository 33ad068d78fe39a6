//! `subsync status`: recorded caption state, read from `project.json` only.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use subsync_core::store;
use subsync_core::types::{CaptionStatus, ProjectFile, ProjectName};

use crate::context;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Limit output to one project.
    pub project: Option<String>,

    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct CaptionStatusJson {
    project: String,
    video_id: String,
    title: String,
    language: String,
    status: String,
    caption_id: Option<String>,
    last_sync: Option<String>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "video")]
    video: String,
    #[tabled(rename = "language")]
    language: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "caption id")]
    caption_id: String,
    #[tabled(rename = "last sync")]
    last_sync: String,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = context::home()?;
        let names = match &self.project {
            Some(name) => {
                let name = ProjectName::from(name.as_str());
                if !store::project_path_at(&home, &name).exists() {
                    bail!("project not found: '{name}'");
                }
                vec![name]
            }
            None => store::list_projects_at(&home).context("failed to list projects")?,
        };

        let mut projects = Vec::with_capacity(names.len());
        for name in &names {
            let project = store::load_at(&home, name)
                .with_context(|| format!("failed to load project '{name}'"))?;
            projects.push(project);
        }

        if self.json {
            let rows: Vec<CaptionStatusJson> = projects.iter().flat_map(json_rows).collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }
        if projects.is_empty() {
            println!("No projects found.");
            return Ok(());
        }
        for project in &projects {
            print_project(project);
        }
        Ok(())
    }
}

fn json_rows(project: &ProjectFile) -> Vec<CaptionStatusJson> {
    let mut rows = Vec::new();
    for (video_id, state) in &project.videos {
        for (language, record) in &state.captions {
            rows.push(CaptionStatusJson {
                project: project.name.to_string(),
                video_id: video_id.to_string(),
                title: state.title.clone(),
                language: language.to_string(),
                status: record.status.to_string(),
                caption_id: record.caption_id.as_ref().map(|id| id.to_string()),
                last_sync: record.last_sync.map(|t| t.to_rfc3339()),
            });
        }
    }
    rows
}

fn print_project(project: &ProjectFile) {
    let captions: usize = project.videos.values().map(|v| v.captions.len()).sum();
    let attention = project
        .videos
        .values()
        .flat_map(|v| v.captions.values())
        .filter(|r| r.status != CaptionStatus::Synced)
        .count();
    println!(
        "{}  {} video(s), {captions} caption(s)",
        project.name.to_string().to_uppercase().bold(),
        project.videos.len()
    );

    let mut table_rows = Vec::new();
    for (video_id, state) in &project.videos {
        if let Some(error) = &state.error {
            println!("  {} {video_id}: {error}", "!".yellow());
        }
        for (language, record) in &state.captions {
            table_rows.push(StatusTableRow {
                video: video_id.to_string(),
                language: language.to_string(),
                status: record.status.to_string(),
                caption_id: record
                    .caption_id
                    .as_ref()
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".into()),
                last_sync: record
                    .last_sync
                    .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                    .unwrap_or_else(|| "never".into()),
            });
        }
    }
    if table_rows.is_empty() {
        println!("  (no captions recorded)");
        return;
    }
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");
    if attention > 0 {
        println!(
            "{}",
            format!("{attention} caption(s) not synced; run 'subsync sync {}'", project.name).yellow()
        );
    }
}
