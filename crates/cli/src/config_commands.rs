use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result, bail},
    clap::Subcommand,
    secrecy::Secret,
};

use voxrelay_config::{
    VoxrelayConfig,
    template::default_config_template,
    validate::{self, Severity},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (file, then environment overrides).
    Show,
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Write a documented default config file.
    Init {
        /// Destination (defaults to the user config directory).
        #[arg(long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = voxrelay_config::discover_and_load();
            print!("{}", render_redacted(&config)?);
            Ok(())
        },
        ConfigAction::Check { verbose } => check(verbose),
        ConfigAction::Init { path, force } => {
            let path = path.unwrap_or_else(voxrelay_config::find_or_default_config_path);
            init_at(&path, force)?;
            eprintln!("Wrote {}", path.display());
            Ok(())
        },
    }
}

/// TOML rendering of `config` with secrets masked.
fn render_redacted(config: &VoxrelayConfig) -> Result<String> {
    let mut config = config.clone();
    if config.voice.stt.cloud.api_key.is_some() {
        config.voice.stt.cloud.api_key = Some(Secret::new("[REDACTED]".into()));
    }
    toml::to_string_pretty(&config).context("serialize config")
}

fn init_at(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    std::fs::write(path, default_config_template())
        .with_context(|| format!("write {}", path.display()))
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(verbose: bool) -> Result<()> {
    let result = validate::validate(None);

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults.\n");
    }

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
            Severity::Info => (CYAN, "info"),
        };

        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{label}{RESET} {}", d.message);
        } else {
            eprintln!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
        }
        shown += 1;
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}
