//! Gangway - release verification and publish pipeline CLI
//!
//! The `gangway` command runs one linear release flow for a version
//! tag pushed on the release line.
//!
//! ## Commands
//!
//! - `run`: gate the tag against packaging metadata, build artifacts,
//!   publish to staging, then promote to production
//! - `check`: evaluate eligibility and the version gate only, without
//!   building or publishing

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gangway_core::{
    declared_version, init_tracing, CommandArtifactBuilder, CredentialSource,
    HttpRegistryPublisher, FsWorkspace, PipelineConfig, ReleasePipeline, ReleaseTrigger,
    RegistryTarget, RunStatus, VersionGate, DEFAULT_DESCRIPTOR, DEFAULT_RELEASE_LINE,
    DEFAULT_TAG_PREFIX,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "gangway")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Release verification and publish pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the full release run for a pushed tag
    Run {
        /// Tag that triggered the run, e.g. v1.2.3
        #[arg(long)]
        tag: String,

        /// Branch the tag was cut from
        #[arg(long)]
        branch: String,

        /// Checkout root the run owns exclusively
        #[arg(long, default_value = ".")]
        workspace: PathBuf,

        /// Packaging descriptor file under the workspace root
        #[arg(long, default_value = DEFAULT_DESCRIPTOR)]
        descriptor: String,

        /// Branch production releases must originate from
        #[arg(long, default_value = DEFAULT_RELEASE_LINE)]
        release_line: String,

        /// Literal prefix release tags carry
        #[arg(long, default_value = DEFAULT_TAG_PREFIX)]
        tag_prefix: String,

        /// Build command, one word per flag so arguments may contain
        /// spaces (e.g. --build-arg sh --build-arg -c --build-arg "make dist")
        #[arg(long = "build-arg", default_values = ["cargo", "package"], allow_hyphen_values = true)]
        build_args: Vec<String>,

        /// Build output directory, relative to the workspace root
        #[arg(long, default_value = "target/package")]
        out_dir: PathBuf,

        /// Staging registry upload endpoint
        #[arg(long)]
        staging_url: String,

        /// Production registry upload endpoint
        #[arg(long)]
        production_url: String,

        /// Environment variable holding the staging bearer token
        #[arg(long, default_value = "GANGWAY_STAGING_TOKEN")]
        staging_token_var: String,

        /// Environment variable holding the production bearer token
        #[arg(long, default_value = "GANGWAY_PRODUCTION_TOKEN")]
        production_token_var: String,

        /// Upper bound on the build, in seconds
        #[arg(long, default_value = "600")]
        build_timeout_secs: u64,

        /// Upper bound on each publish attempt, in seconds
        #[arg(long, default_value = "120")]
        publish_timeout_secs: u64,

        /// Retry budget for transient publish failures
        #[arg(long, default_value = "2")]
        retries: u32,

        /// Write the terminal run record as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Evaluate eligibility and the version gate without side effects
    Check {
        /// Tag to check, e.g. v1.2.3
        #[arg(long)]
        tag: String,

        /// Branch the tag was cut from
        #[arg(long)]
        branch: String,

        /// Checkout root
        #[arg(long, default_value = ".")]
        workspace: PathBuf,

        /// Packaging descriptor file under the workspace root
        #[arg(long, default_value = DEFAULT_DESCRIPTOR)]
        descriptor: String,

        /// Branch production releases must originate from
        #[arg(long, default_value = DEFAULT_RELEASE_LINE)]
        release_line: String,

        /// Literal prefix release tags carry
        #[arg(long, default_value = DEFAULT_TAG_PREFIX)]
        tag_prefix: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            tag,
            branch,
            workspace,
            descriptor,
            release_line,
            tag_prefix,
            build_args,
            out_dir,
            staging_url,
            production_url,
            staging_token_var,
            production_token_var,
            build_timeout_secs,
            publish_timeout_secs,
            retries,
            report,
        } => {
            let config = PipelineConfig {
                tag_prefix,
                release_line,
                build_timeout: Duration::from_secs(build_timeout_secs),
                publish_timeout: Duration::from_secs(publish_timeout_secs),
                transient_retries: retries,
                ..PipelineConfig::default()
            };
            cmd_run(
                config,
                ReleaseTrigger::new(tag, branch),
                &workspace,
                &descriptor,
                build_args,
                out_dir,
                staging_url,
                production_url,
                staging_token_var,
                production_token_var,
                report.as_deref(),
            )
            .await
        }
        Commands::Check {
            tag,
            branch,
            workspace,
            descriptor,
            release_line,
            tag_prefix,
        } => cmd_check(
            ReleaseTrigger::new(tag, branch),
            &workspace,
            &descriptor,
            &release_line,
            &tag_prefix,
        ),
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    config: PipelineConfig,
    trigger: ReleaseTrigger,
    workspace_root: &std::path::Path,
    descriptor: &str,
    build_args: Vec<String>,
    out_dir: PathBuf,
    staging_url: String,
    production_url: String,
    staging_token_var: String,
    production_token_var: String,
    report: Option<&std::path::Path>,
) -> Result<()> {
    let declared = declared_version(workspace_root, descriptor)
        .context("Failed to read the packaging descriptor")?;

    let workspace = FsWorkspace::new(workspace_root, vec![out_dir.clone()]);
    let builder = CommandArtifactBuilder::new(build_args, out_dir, config.build_timeout);
    let publisher = HttpRegistryPublisher::new(config.publish_timeout)
        .context("Failed to construct registry publisher")?;

    let staging = RegistryTarget::new(
        "staging",
        staging_url,
        CredentialSource::Env {
            var: staging_token_var,
        },
    );
    let production = RegistryTarget::new(
        "production",
        production_url,
        CredentialSource::Env {
            var: production_token_var,
        },
    );

    let pipeline = ReleasePipeline::new(config, &builder, &publisher);
    let run = pipeline
        .run(trigger, &workspace, &declared, &staging, &production)
        .await;

    if let Some(path) = report {
        let json = serde_json::to_string_pretty(&run)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run report to {}", path.display()))?;
        info!(path = %path.display(), "Wrote run report");
    }

    let partial = run.is_partial_release();
    match run.status {
        RunStatus::Succeeded => {
            println!("Release {} published to staging and production", run.trigger.tag);
            Ok(())
        }
        RunStatus::Aborted => {
            println!("Trigger ignored (not an eligible release event)");
            Ok(())
        }
        RunStatus::Failed { stage, cause } => {
            if partial {
                bail!(
                    "release failed at stage '{stage}' AFTER staging succeeded; \
                     registries need manual reconciliation: {cause}"
                );
            }
            bail!("release failed at stage '{stage}': {cause}");
        }
    }
}

fn cmd_check(
    trigger: ReleaseTrigger,
    workspace_root: &std::path::Path,
    descriptor: &str,
    release_line: &str,
    tag_prefix: &str,
) -> Result<()> {
    if !trigger.is_eligible(tag_prefix, release_line) {
        println!(
            "Tag '{}' from branch '{}' would be ignored (release line is '{}')",
            trigger.tag, trigger.source_branch, release_line
        );
        return Ok(());
    }

    let declared = declared_version(workspace_root, descriptor)
        .context("Failed to read the packaging descriptor")?;

    match VersionGate::check(&trigger, &declared, tag_prefix) {
        Ok(()) => {
            println!(
                "Tag '{}' matches declared version '{}'; run would proceed",
                trigger.tag, declared
            );
            Ok(())
        }
        Err(mismatch) => bail!("version gate would reject this run: {mismatch}"),
    }
}
