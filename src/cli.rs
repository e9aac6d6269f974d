//! Command-line interface definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::disc::DiscKey;

/// Resolves configured disc stream selections to disc indices and container track ids.
#[derive(Parser, Debug)]
#[command(name = "bdmv-tracks", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "bdmv-tracks.yaml", env = "CONFIG_PATH", global = true)]
    pub config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Returns the log level from verbosity flags, or the configured level without any.
    pub fn log_level<'a>(&self, configured: &'a str) -> &'a str {
        match self.verbose {
            0 => configured,
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve configured titles against a disc and print the plan.
    Plan(PlanArgs),

    /// List the titles of a disc-info dump by source key.
    Titles {
        /// Robot-mode disc info dump, as [NAME[:HASH]=]FILE.
        #[arg(value_parser = parse_disc_arg)]
        disc: DiscSource,
    },

    /// Validate the configuration and selection files.
    #[command(name = "config-validate")]
    ConfigValidate,

    /// Display the parsed configuration.
    #[command(name = "config-show")]
    ConfigShow,
}

/// Arguments for the plan subcommand.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Robot-mode disc info dumps, as [NAME[:HASH]=]FILE. NAME defaults to the file stem.
    #[arg(required = true, value_parser = parse_disc_arg)]
    pub discs: Vec<DiscSource>,

    /// Selection files to use instead of the configured globs.
    #[arg(short, long = "selections")]
    pub selections: Vec<PathBuf>,

    /// Only plan titles matching these selection file names, disc names or hashes, or title keys.
    #[arg(short, long = "title")]
    pub titles: Vec<String>,

    /// Container inspection JSON of an extracted title, as [DISC/]TITLE=FILE.
    #[arg(long = "container", value_parser = parse_container_arg)]
    pub containers: Vec<ContainerSource>,
}

/// A disc-info dump and the key selection files know the disc by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscSource {
    pub key: DiscKey,
    pub path: PathBuf,
}

/// Container inspection output of one extracted title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSource {
    /// Disc name; may be left out when a single disc is loaded.
    pub disc: Option<String>,
    pub title: String,
    pub path: PathBuf,
}

fn parse_disc_arg(value: &str) -> Result<DiscSource, String> {
    let (key, file) = match value.split_once('=') {
        Some((key, file)) => (Some(DiscKey::parse(key)), file),
        None => (None, value),
    };
    if file.is_empty() {
        return Err(format!("expected [NAME[:HASH]=]FILE, got '{}'", value));
    }

    let path = PathBuf::from(file);
    let key = match key {
        Some(key) if !key.name.is_empty() => key,
        Some(_) => return Err(format!("missing disc name in '{}'", value)),
        None => {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .ok_or_else(|| format!("cannot derive a disc name from '{}'", value))?;
            DiscKey::new(stem)
        }
    };
    Ok(DiscSource { key, path })
}

fn parse_container_arg(value: &str) -> Result<ContainerSource, String> {
    let Some((target, file)) = value.split_once('=') else {
        return Err(format!("expected [DISC/]TITLE=FILE, got '{}'", value));
    };
    let (disc, title) = match target.split_once('/') {
        Some((disc, title)) => (Some(disc.to_string()), title),
        None => (None, target),
    };
    if title.is_empty() || file.is_empty() || disc.as_deref() == Some("") {
        return Err(format!("expected [DISC/]TITLE=FILE, got '{}'", value));
    }
    Ok(ContainerSource {
        disc,
        title: title.to_string(),
        path: PathBuf::from(file),
    })
}
