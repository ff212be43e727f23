//! Pipeline runner binary.

use anyhow::{bail, Context};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vtour_models::{format_duration, StageName};
use vtour_pipeline::{environment_checks, Orchestrator, RunContext};
use vtour_store::ProjectStore;

const USAGE: &str = "usage: vtour <command>

commands:
  run <project-id>                run the full pipeline for a project
  run-stage <project-id> <stage>  re-run one stage (spatial|render|reasoning|composite)
  relaunch <project-id>           reset a project and run it again
  list                            list persisted projects, newest first
  check                           probe pipeline prerequisites";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let ctx = RunContext::from_env();
    let store = ProjectStore::new(ctx.projects_root.clone());

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(err) = dispatch(ctx, store, &args).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("vtour_pipeline=info,vtour_media=info,vtour_store=info")
    });

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn dispatch(ctx: RunContext, store: ProjectStore, args: &[String]) -> anyhow::Result<()> {
    let command = args.first().map(String::as_str).unwrap_or("");
    match command {
        "run" => {
            let id = required(args, 1, "project id")?;
            let orchestrator = Orchestrator::new(ctx, store);
            let mut project = orchestrator.store().read(id).await?;
            info!(project_id = %project.id, "starting pipeline run");
            orchestrator.run(&mut project).await?;
            println!("{} -> {}", project.id, project.status);
            Ok(())
        }
        "run-stage" => {
            let id = required(args, 1, "project id")?;
            let stage: StageName = required(args, 2, "stage name")?.parse()?;
            let orchestrator = Orchestrator::new(ctx, store);
            let mut project = orchestrator.store().read(id).await?;
            orchestrator.run_stage(&mut project, stage).await?;
            println!("{} {} -> {}", project.id, stage, project.status);
            Ok(())
        }
        "relaunch" => {
            let id = required(args, 1, "project id")?;
            let orchestrator = Orchestrator::new(ctx, store);
            let mut project = orchestrator.store().read(id).await?;
            orchestrator.relaunch(&mut project).await?;
            println!("{} -> {}", project.id, project.status);
            Ok(())
        }
        "list" => {
            let projects = store.scan().await?;
            if projects.is_empty() {
                println!("no projects under {}", store.root().display());
                return Ok(());
            }
            for project in projects {
                let age = format_duration(project.updated_at, None);
                println!(
                    "{:<40} {:<12} updated {} ago",
                    project.id, project.status, age
                );
            }
            Ok(())
        }
        "check" => {
            let checks = environment_checks(&ctx).await;
            let mut failures = 0;
            for check in &checks {
                let mark = if check.ok { "ok " } else { "FAIL" };
                let detail = check
                    .version
                    .as_deref()
                    .or(check.error.as_deref())
                    .unwrap_or("");
                println!("[{mark}] {:<20} {detail}", check.name);
                if !check.ok {
                    failures += 1;
                }
            }
            if failures > 0 {
                bail!("{failures} prerequisite(s) missing");
            }
            Ok(())
        }
        "" | "help" | "--help" | "-h" => {
            println!("{USAGE}");
            Ok(())
        }
        other => bail!("unknown command '{other}'\n{USAGE}"),
    }
}

fn required<'a>(args: &'a [String], index: usize, what: &str) -> anyhow::Result<&'a String> {
    args.get(index)
        .with_context(|| format!("missing {what}\n{USAGE}"))
}
