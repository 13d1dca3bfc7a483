use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result, bail},
    clap::Subcommand,
};

use relaydesk_config::{
    ServerConfig, Severity, default_config_template, discover_and_load, validate,
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the resolved configuration (file + environment).
    Check,
    /// Write a documented starter config file.
    Init {
        /// Destination file.
        #[arg(long, default_value = "relaydesk.toml")]
        path: PathBuf,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

pub fn handle_config(action: ConfigAction, config_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Check => check(config_path),
        ConfigAction::Init { path, force } => {
            init(&path, force)?;
            eprintln!("Wrote {}", path.display());
            Ok(())
        },
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config_path: Option<&Path>) -> Result<()> {
    let config = discover_and_load(config_path)?;
    let result = validate(&config);

    for d in &result.diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
    }

    let errors = result
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warnings = result.diagnostics.len() - errors;
    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("\n{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let template = default_config_template(ServerConfig::default().port);
    std::fs::write(path, template).with_context(|| format!("failed to write {}", path.display()))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_a_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relaydesk.toml");

        init(&path, false).unwrap();
        let cfg = relaydesk_config::load_config(&path).unwrap();
        assert_eq!(cfg.server.port, 3000);
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relaydesk.toml");
        std::fs::write(&path, "agents = [1]\n").unwrap();

        assert!(init(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "agents = [1]\n");

        init(&path, true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("[telegram]"));
    }
}
