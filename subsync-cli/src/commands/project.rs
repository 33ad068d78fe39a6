//! `subsync project create` and `subsync project list`.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use subsync_core::store;
use subsync_core::types::{ProjectName, VideoId};
use subsync_sync::create::{create_project_at, ProjectSource};

use crate::context::{self, Remote};

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Create a project from a channel's uploads or from explicit videos.
    Create(CreateArgs),

    /// List projects under `~/.subsync/projects/`.
    List,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Project name (directory under `~/.subsync/projects/`).
    pub name: String,

    /// Channel nickname from `~/.subsync/config.yaml`.
    #[arg(long, conflicts_with = "video", required_unless_present = "video")]
    pub channel: Option<String>,

    /// Video id to include; repeat for several videos.
    #[arg(long = "video", value_name = "VIDEO_ID")]
    pub video: Vec<String>,

    #[arg(long)]
    pub no_cache: bool,
}

pub fn run(cmd: ProjectCommand) -> Result<()> {
    match cmd {
        ProjectCommand::Create(args) => create(args),
        ProjectCommand::List => list(),
    }
}

fn create(args: CreateArgs) -> Result<()> {
    let home = context::home()?;
    let mut remote = Remote::open(&home, args.no_cache);
    let source = match &args.channel {
        Some(nickname) => {
            let channel_id = remote
                .config
                .channel_id(nickname, &home)
                .context("cannot resolve channel")?;
            ProjectSource::Channel(channel_id.to_string())
        }
        None => ProjectSource::Videos(args.video.iter().map(|v| VideoId::from(v.as_str())).collect()),
    };
    let name = ProjectName::from(args.name.as_str());

    let result = {
        let mut session = remote.session();
        create_project_at(&home, &name, source, &mut session)
    };
    remote.report_quota();
    let report = result.with_context(|| format!("failed to create project '{name}'"))?;

    for (video_id, reason) in &report.failed {
        println!("  {} {video_id}: {reason}", "!".yellow());
    }
    println!(
        "{} project '{name}' created: {} video(s), {} caption(s)",
        "✓".green(),
        report.videos,
        report.captions
    );
    println!("  {}", report.path.display());
    Ok(())
}

fn list() -> Result<()> {
    let home = context::home()?;
    let projects = store::list_projects_at(&home).context("failed to list projects")?;
    if projects.is_empty() {
        println!("No projects yet.");
        println!("Run: subsync project create <name> --channel <nickname>");
        return Ok(());
    }
    for name in projects {
        match store::load_at(&home, &name) {
            Ok(project) => {
                let captions: usize = project.videos.values().map(|v| v.captions.len()).sum();
                println!(
                    "{name}  ({} video(s), {captions} caption(s))",
                    project.videos.len()
                );
            }
            Err(err) => println!("{name}  {}", format!("unreadable: {err}").red()),
        }
    }
    Ok(())
}
