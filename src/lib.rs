//! bdmv-tracks - stream selection resolution for Blu-ray rips.
//!
//! Turns per-title stream selections (ordinals among a title's real streams,
//! optionally asking for the derived core or forced sibling) into the disc
//! stream indices a ripper reports, and then into the track ids of the file
//! it extracted.

pub mod cli;
pub mod config;
pub mod disc;
pub mod error;
pub mod plan;
pub mod streams;
pub mod validation;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::{Cli, Commands, ContainerSource, DiscSource, PlanArgs};
use crate::config::loader;
use crate::config::model::{AppConfig, LogFormat};
use crate::disc::{parse_disc_info, resolve_titles, Disc, Title};
use crate::error::AppError;
use crate::plan::{Planner, SourceTitle};
use crate::streams::{parse_identification, ContainerTrack, ContainerTrackMap};
use crate::validation::{report, Severity};

/// Runs the command selected on the command line.
pub async fn run(cli: Cli) -> Result<()> {
    let config = loader::load_or_default(&cli.config)?;
    setup_logging(cli.log_level(&config.log_level), config.log_format)?;

    match &cli.command {
        Commands::Plan(args) => plan(args, &config, &cli.config).await,
        Commands::Titles { disc } => list_titles(disc).await,
        Commands::ConfigValidate => validate_config(&config, &cli.config).await,
        Commands::ConfigShow => show_config(&config),
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so plans printed on stdout stay machine-readable.
fn setup_logging(level: &str, format: LogFormat) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match format {
        LogFormat::Json => builder.json().with_file(true).with_line_number(true).init(),
        LogFormat::Pretty => builder.init(),
    }

    Ok(())
}

/// Reads a disc-info dump and resolves its titles.
async fn load_disc(source: &DiscSource) -> Result<Disc, AppError> {
    let content = tokio::fs::read_to_string(&source.path).await?;
    let report = parse_disc_info(&content)?;
    let disc = resolve_titles(&source.key, &source.path, &report)?;
    info!(disc = %disc.name, path = %disc.path.display(), titles = disc.titles.len(), "Disc titles resolved");
    Ok(disc)
}

async fn load_discs(sources: &[DiscSource]) -> Result<Vec<Disc>> {
    let mut discs = Vec::with_capacity(sources.len());
    for source in sources {
        let disc = load_disc(source)
            .await
            .with_context(|| format!("Failed to load disc info from {}", source.path.display()))?;
        if discs.iter().any(|d: &Disc| d.name == disc.name) {
            anyhow::bail!("Disc {} was given more than once", disc.name);
        }
        discs.push(disc);
    }
    Ok(discs)
}

/// Reads the container inspection output supplied for each extracted title.
async fn load_containers(
    containers: &[ContainerSource],
    discs: &[Disc],
) -> Result<HashMap<SourceTitle, ContainerTrackMap>> {
    let mut maps = HashMap::with_capacity(containers.len());

    for container in containers {
        let disc = match (&container.disc, discs) {
            (Some(name), _) => name.clone(),
            (None, [only]) => only.name.clone(),
            (None, _) => anyhow::bail!(
                "Container info for {} must name its disc as DISC/{}",
                container.title,
                container.title
            ),
        };
        let tracks = read_container(&container.path)
            .await
            .with_context(|| format!("Failed to load container info from {}", container.path.display()))?;
        let map = ContainerTrackMap::from_tracks(&tracks);
        debug!(disc = %disc, title = %container.title, tracks = map.len(), "Loaded container tracks");
        maps.insert(SourceTitle::new(disc, container.title.clone()), map);
    }

    Ok(maps)
}

async fn read_container(path: &Path) -> Result<Vec<ContainerTrack>, AppError> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(parse_identification(&content)?)
}

/// Resolves configured titles against the given discs and prints the plan as JSON.
async fn plan(args: &PlanArgs, config: &AppConfig, config_path: &Path) -> Result<()> {
    let paths = if args.selections.is_empty() {
        let base_dir = loader::base_dir(config_path);
        loader::validate_loaded(config, &base_dir)?;
        loader::selection_paths(config, &base_dir)?
    } else {
        args.selections.clone()
    };

    let outputs = loader::load_selections(&paths, &args.titles).await?;
    loader::validate_selections(&outputs)?;

    let discs = load_discs(&args.discs).await?;
    let containers = load_containers(&args.containers, &discs).await?;

    let planner = Planner::new(&discs, config.failure_policy);
    let plans = planner.plan_all(&outputs, &containers)?;
    if plans.is_empty() {
        warn!("No configured titles matched the given discs");
    }

    println!("{}", serde_json::to_string_pretty(&plans)?);
    Ok(())
}

/// Prints the titles of a disc-info dump keyed by source.
async fn list_titles(source: &DiscSource) -> Result<()> {
    let disc = load_disc(source)
        .await
        .with_context(|| format!("Failed to load disc info from {}", source.path.display()))?;
    let titles: BTreeMap<&str, &Title> = disc
        .keys()
        .into_iter()
        .filter_map(|key| disc.title(key).map(|title| (key, title.as_ref())))
        .collect();

    println!("{}", serde_json::to_string_pretty(&titles)?);
    Ok(())
}

/// Checks the configuration and every selection file it points at.
async fn validate_config(config: &AppConfig, config_path: &Path) -> Result<()> {
    let base_dir = loader::base_dir(config_path);
    let mut findings = validation::check_config(config, &base_dir);

    if !findings.has_errors() {
        let paths = loader::selection_paths(config, &base_dir)?;
        let outputs = loader::load_selections(&paths, &[]).await?;
        findings.append(validation::check_selections(&outputs));
    }

    print!("{}", report::render(&findings));
    info!("{}", report::summary(&findings));

    if findings.has_errors() {
        anyhow::bail!(error::ConfigError::ValidationFailed {
            error_count: findings.count(Severity::Error)
        });
    }
    Ok(())
}

/// Displays the effective configuration.
fn show_config(config: &AppConfig) -> Result<()> {
    let yaml = serde_yaml::to_string(config)?;
    println!("{}", yaml);
    Ok(())
}
