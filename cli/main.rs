#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use polars::prelude::DataFrame;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use stratawatch::data;
use stratawatch::dispatch::{DispatchObserver, DispatchSummary};
use stratawatch::{
    DataProfile, DataSplitter, Dispatcher, MonitorConfig, Operation, SnapshotEngine,
    SnapshotWorkspace,
};

#[derive(Clone, Copy, ValueEnum)]
enum OperationCli {
    Report,
    Test,
}

impl From<OperationCli> for Operation {
    fn from(operation: OperationCli) -> Self {
        match operation {
            OperationCli::Report => Operation::Report,
            OperationCli::Test => Operation::Test,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "stratawatch",
    about = "Stratified data quality and drift monitoring",
    long_about = "Splits monitored datasets into demographic and operational strata, forms every \
                 pairwise combination and hands each one to the reporting engine."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full monitoring flow on the current dataset
    #[command(about = "Split, generate reports and test suites (outputs: snapshots/)")]
    Run {
        /// Monitoring config (TOML); searched in the default locations when omitted
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Current dataset (CSV or TSV)
        #[arg(long, value_name = "PATH")]
        current: PathBuf,

        /// Reference dataset; created from the current data when missing
        #[arg(long, value_name = "PATH")]
        reference: PathBuf,

        /// Data profile (TOML); created when missing
        #[arg(long, value_name = "PATH")]
        profile: PathBuf,

        /// Snapshot workspace root
        #[arg(long, value_name = "DIR", default_value = ".")]
        workspace: PathBuf,

        /// Run identifier; defaults to the current Unix time
        #[arg(long)]
        timestamp: Option<String>,
    },

    /// Print the combinations of a dataset and their row counts
    #[command(about = "List stratified combinations")]
    Split {
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        #[arg(long, value_name = "PATH")]
        data: PathBuf,

        #[arg(long, value_name = "PATH")]
        profile: PathBuf,

        #[arg(long, value_enum, default_value_t = OperationCli::Report)]
        operation: OperationCli,
    },

    /// Fold a dataset into the data profile
    #[command(about = "Update the data profile (outputs: profile TOML)")]
    Profile {
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        #[arg(long, value_name = "PATH")]
        data: PathBuf,

        #[arg(long, value_name = "PATH")]
        profile: PathBuf,
    },

    /// Display version information
    #[command(about = "Display version information")]
    Version,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Cli { command } = Cli::parse();
    let result = match command {
        Some(Commands::Run {
            config,
            current,
            reference,
            profile,
            workspace,
            timestamp,
        }) => run_monitoring(
            config.as_deref(),
            &current,
            &reference,
            &profile,
            &workspace,
            timestamp,
        ),
        Some(Commands::Split {
            config,
            data,
            profile,
            operation,
        }) => run_split(config.as_deref(), &data, &profile, operation.into()),
        Some(Commands::Profile {
            config,
            data,
            profile,
        }) => run_profile(config.as_deref(), &data, &profile),
        Some(Commands::Version) => {
            println!("stratawatch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        None => Cli::command()
            .print_help()
            .map(|()| println!())
            .map_err(Into::into),
    };

    if let Err(e) = result {
        log::error!("{e}");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn load_config(path: Option<&Path>) -> CliResult<MonitorConfig> {
    let config = match path {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::discover(MonitorConfig::default_paths().as_slice())?,
    };
    Ok(config)
}

/// Folds a validated dataset into the profile and saves it.
fn update_profile(
    config: &MonitorConfig,
    current: &DataFrame,
    profile_path: &Path,
) -> CliResult<DataProfile> {
    let mut profile = DataProfile::load(profile_path)?;
    profile.update(current, config)?;
    profile.save(profile_path)?;
    Ok(profile)
}

fn run_monitoring(
    config_path: Option<&Path>,
    current_path: &Path,
    reference_path: &Path,
    profile_path: &Path,
    workspace_root: &Path,
    timestamp: Option<String>,
) -> CliResult<()> {
    let config = load_config(config_path)?;
    let Some(current) = data::load_current(current_path, &config)? else {
        return Ok(());
    };
    let reference = data::load_reference(reference_path, &current, &config)?;
    let profile = update_profile(&config, &current, profile_path)?;

    let mut splitter = DataSplitter::new();
    let reports = splitter.split(&current, &config, &profile, Operation::Report)?;
    let tests = splitter.split(&current, &config, &profile, Operation::Test)?;

    let mut workspace = SnapshotWorkspace::open(workspace_root)?;
    let timestamp = timestamp.unwrap_or_else(unix_timestamp);
    let engine = SnapshotEngine::new(&workspace);
    let dispatcher = Dispatcher::new(&engine, &config, &profile, timestamp.clone());
    let progress = BarProgress::new();

    let (report_summary, test_summary) = rayon::join(
        || dispatcher.dispatch(&reports, &current, &reference, &progress),
        || dispatcher.dispatch(&tests, &current, &reference, &progress),
    );
    progress.finish();
    let summaries = [report_summary?, test_summary?];

    workspace.reload()?;
    for summary in &summaries {
        print_summary(summary);
    }
    println!(
        "Snapshot {timestamp} written to {} ({} runs on disk)",
        workspace.root().display(),
        workspace.runs().len()
    );
    Ok(())
}

fn run_split(
    config_path: Option<&Path>,
    data_path: &Path,
    profile_path: &Path,
    operation: Operation,
) -> CliResult<()> {
    let config = load_config(config_path)?;
    let Some(current) = data::load_current(data_path, &config)? else {
        return Ok(());
    };
    let profile = match DataProfile::read(profile_path)? {
        Some(profile) => profile,
        None => {
            log::warn!(
                "No data profile at {}; run `stratawatch profile` first",
                profile_path.display()
            );
            DataProfile::default()
        }
    };
    for dimension in profile.missing_dimensions(&config) {
        log::warn!(
            "Profile has no known {} values; those strata are skipped",
            dimension.name()
        );
    }
    let stratifications = DataSplitter::new().split(&current, &config, &profile, operation)?;

    let mut subsets: Vec<_> = stratifications.subsets().iter().collect();
    subsets.sort_by(|a, b| natord::compare(a.key(), b.key()));
    for subset in subsets {
        println!("{}\t{}", subset.key(), subset.len());
    }
    Ok(())
}

fn run_profile(config_path: Option<&Path>, data_path: &Path, profile_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    if let Some(current) = data::load_current(data_path, &config)? {
        update_profile(&config, &current, profile_path)?;
        println!("Profile updated at {}", profile_path.display());
    }
    Ok(())
}

fn unix_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        .to_string()
}

fn print_summary(summary: &DispatchSummary) {
    println!(
        "{}: {} combinations, {} artifacts, {} failures",
        summary.operation,
        summary.keys,
        summary.generated.len(),
        summary.failures.len()
    );
    for failure in &summary.failures {
        match failure.suite {
            Some(suite) => println!("  {} ({suite}): {}", failure.key, failure.message),
            None => println!("  {}: {}", failure.key, failure.message),
        }
    }
}

/// Renders dispatch progress on stderr when it is a terminal.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let draw_target = if std::io::stderr().is_terminal() {
            ProgressDrawTarget::stderr_with_hz(20)
        } else {
            ProgressDrawTarget::hidden()
        };
        let bar = ProgressBar::with_draw_target(Some(0), draw_target);
        if let Ok(style) =
            ProgressStyle::with_template("> [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
        }
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl DispatchObserver for BarProgress {
    fn on_start(&self, operation: Operation, total_keys: usize) {
        log::debug!("Queued {total_keys} {operation} combinations");
        self.bar.inc_length(total_keys as u64);
    }

    fn on_key_finished(&self, operation: Operation, key: &str, failures: usize) {
        if failures > 0 {
            self.bar.set_message(format!("{operation} {key} ({failures} failed)"));
        } else {
            self.bar.set_message(format!("{operation} {key}"));
        }
        self.bar.inc(1);
    }
}
