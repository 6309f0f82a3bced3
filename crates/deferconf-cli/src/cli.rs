//! deferconf CLI - inspect the settings a process would resolve
//!
//! Usage:
//!   deferconf --module project.settings get SECRET_KEY
//!   deferconf --module project.settings dump --format json
//!   deferconf --module project.settings diff --all
//!   deferconf --module project.settings check

use clap::{Parser, Subcommand};
use colored::Colorize;
use deferconf_core::{
    Catalog, Error, ErrorKind, FileLoader, Settings, SettingsOptions, SettingsProvider, Value,
    ENVIRONMENT_VARIABLE,
};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// deferconf - Inspect deferred application settings
#[derive(Parser)]
#[command(name = "deferconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Dotted path of the settings module
    #[arg(short, long, global = true, env = ENVIRONMENT_VARIABLE)]
    module: Option<String>,

    /// Directory settings modules are resolved against
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a single resolved setting
    Get {
        /// Setting name (e.g., SECRET_KEY)
        name: String,

        /// Output format: text, json, yaml
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Value to print if the setting is not defined
        #[arg(short, long)]
        default: Option<String>,
    },

    /// Print every resolved setting
    Dump {
        /// Output format: yaml, json
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Show settings that differ from the default catalog
    Diff {
        /// Also show settings left at their defaults (prefixed with ###)
        #[arg(short, long)]
        all: bool,
    },

    /// Resolve the settings module and report any error
    Check,
}

/// Run the CLI with the process arguments
pub fn run() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let Some(module) = cli.module.as_deref().filter(|m| !m.is_empty()) else {
        eprintln!(
            "{}: No settings module given: pass --module or set {}",
            "Error".red(),
            ENVIRONMENT_VARIABLE
        );
        return ExitCode::from(2);
    };

    let settings = match load_settings(module, cli.root) {
        Ok(s) => s,
        Err(e) => {
            if matches!(cli.command, Commands::Check) {
                println!("{} {}: {}", "✗".red(), module, e);
            } else {
                eprintln!("{}: Failed to load settings '{}': {}", "Error".red(), module, e);
            }
            return ExitCode::from(exit_code(&e));
        }
    };

    match cli.command {
        Commands::Get {
            name,
            format,
            default,
        } => cmd_get(&settings, &name, &format, default),
        Commands::Dump { format } => cmd_dump(&settings, &format),
        Commands::Diff { all } => cmd_diff(&settings, all),
        Commands::Check => {
            println!(
                "{} {}: settings resolved",
                "✓".green(),
                settings.settings_module()
            );
            ExitCode::SUCCESS
        }
    }
}

fn load_settings(module: &str, root: PathBuf) -> Result<Settings, Error> {
    let options = SettingsOptions {
        defaults: Catalog::global(),
        loader: Arc::new(FileLoader::new(root)),
        apply_time_zone: false,
    };
    Settings::with_options(module, &options)
}

/// Invalid settings exit with 1; a module that cannot be read exits with 2
fn exit_code(err: &Error) -> u8 {
    match err.kind {
        ErrorKind::Misconfiguration | ErrorKind::TypeCoercion | ErrorKind::SettingNotFound => 1,
        _ => 2,
    }
}

fn render(value: &Value, format: &str) -> Result<String, String> {
    match format {
        "json" => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
        "yaml" => serde_yaml::to_string(value)
            .map(|s| s.trim_end().to_string())
            .map_err(|e| e.to_string()),
        _ => Ok(match value {
            Value::Sequence(_) | Value::Mapping(_) => serde_yaml::to_string(value)
                .map(|s| s.trim_end().to_string())
                .map_err(|e| e.to_string())?,
            scalar => scalar.to_string(),
        }),
    }
}

fn cmd_get(settings: &Settings, name: &str, format: &str, default: Option<String>) -> ExitCode {
    match settings.get(name) {
        Ok(value) => match render(&value, format) {
            Ok(s) => {
                println!("{}", s);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                ExitCode::from(1)
            }
        },
        Err(e) if e.is_not_found() => {
            if let Some(default_val) = default {
                println!("{}", default_val);
                ExitCode::SUCCESS
            } else {
                eprintln!("{}: Setting '{}' not found", "Error".red(), name);
                ExitCode::from(1)
            }
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_dump(settings: &Settings, format: &str) -> ExitCode {
    let mut all = IndexMap::new();
    for name in settings.names() {
        match settings.get(&name) {
            Ok(value) => {
                all.insert(name, value);
            }
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                return ExitCode::from(1);
            }
        }
    }

    let format = if format == "json" { "json" } else { "yaml" };
    match render(&Value::Mapping(all), format) {
        Ok(content) => {
            println!("{}", content);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

/// One line of `diff` output, or `None` if the setting is hidden
fn diff_line(name: &str, value: &Value, default: Option<&Value>, all: bool) -> Option<String> {
    match default {
        None => Some(format!("{} = {}  ###", name, value)),
        Some(d) if d != value => Some(format!("{} = {}", name, value)),
        Some(_) if all => Some(format!("### {} = {}", name, value)),
        Some(_) => None,
    }
}

fn cmd_diff(settings: &Settings, all: bool) -> ExitCode {
    let catalog = Catalog::global();

    for name in settings.names() {
        if name == "SETTINGS_MODULE" {
            continue;
        }
        let Ok(value) = settings.get(&name) else {
            continue;
        };
        let default = catalog.get(&name).ok();
        if let Some(line) = diff_line(&name, &value, default.as_ref(), all) {
            if line.starts_with("### ") {
                println!("{}", line.dimmed());
            } else {
                println!("{}", line.yellow());
            }
        }
    }

    ExitCode::SUCCESS
}
