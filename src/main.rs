use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use group_forecast::config::DEFAULT_CONFIG_FILE;
use group_forecast::{model_levels, Orchestrator, PipelineConfig, ResultStore, ShutdownSignal};
use sales_owl::{interrupt, parse_group_key, ConfigOverrides};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Train one forecasting model per group of a retail sales table
#[derive(Parser, Debug)]
#[command(name = "sales_owl", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Partition, train and persist every group of the configured level
    Run(RunArgs),

    /// Print the model level catalog
    Levels,

    /// Print the effective configuration
    Config(ConfigArgs),

    /// List the group keys in the result store
    List(StoreArgs),

    /// Print the stored result of one group
    Show(ShowArgs),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// YAML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Directory holding calendar.csv, sales_train.csv and sell_prices.csv
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory for result files
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Jobs in flight at once
    #[arg(long)]
    max_concurrency: Option<usize>,
}

impl ConfigArgs {
    fn load(&self) -> Result<PipelineConfig> {
        let config = PipelineConfig::load(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;
        let overrides = ConfigOverrides {
            data_dir: self.data_dir.clone(),
            results_dir: self.results_dir.clone(),
            max_concurrency: self.max_concurrency,
        };
        let config = overrides.apply(config);
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// Directory for result files
    #[arg(long, default_value = "./results")]
    results_dir: PathBuf,
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Group-by values in column order, or one encoded key
    #[arg(required = true)]
    values: Vec<String>,

    #[command(flatten)]
    store: StoreArgs,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

impl Cli {
    fn run(self) -> Result<ExitCode> {
        match self.command {
            Commands::Run(args) => {
                let config = args.config.load()?;
                tracing::info!(
                    config = %args.config.config.display(),
                    data_dir = %config.data_dir.display(),
                    results_dir = %config.results_dir.display(),
                    "starting run"
                );
                let shutdown = ShutdownSignal::new();
                let handler_signal = shutdown.clone();
                ctrlc::set_handler(move || {
                    if interrupt(&handler_signal) {
                        eprintln!("Interrupted: waiting for running groups, press Ctrl-C again to exit now");
                    } else {
                        std::process::exit(130);
                    }
                })
                .context("installing the Ctrl-C handler")?;

                let orchestrator = Orchestrator::from_config(config)?.with_shutdown(shutdown);
                let report = orchestrator.run_from_disk().map_err(|err| {
                    if err.is_fatal() {
                        anyhow::Error::new(err).context("run aborted before any group was scheduled")
                    } else {
                        anyhow::Error::new(err)
                    }
                })?;
                print!("{}", report);
                // partial failures are reported, not fatal, but still visible to scripts
                if report.summary.is_clean() {
                    Ok(ExitCode::SUCCESS)
                } else {
                    Ok(ExitCode::from(2))
                }
            }
            Commands::Levels => {
                for level in model_levels() {
                    println!("{}", level);
                }
                Ok(ExitCode::SUCCESS)
            }
            Commands::Config(args) => {
                let config = args.load()?;
                let level = config.model_level()?;
                print!("{}", config.to_yaml()?);
                println!("# level {}: {}", level.id(), level.group_by_columns().join(", "));
                Ok(ExitCode::SUCCESS)
            }
            Commands::List(args) => {
                let store = open_store(&args)?;
                for key in store.list()? {
                    println!("{}", key);
                }
                Ok(ExitCode::SUCCESS)
            }
            Commands::Show(args) => {
                let store = open_store(&args.store)?;
                let key = parse_group_key(&args.values)?;
                let raw = store.get_raw(&key)?;
                let value: serde_json::Value = serde_json::from_str(&raw)
                    .with_context(|| format!("result of {} is not valid JSON", key))?;
                println!("{}", serde_json::to_string_pretty(&value)?);
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

fn open_store(args: &StoreArgs) -> Result<ResultStore> {
    if !args.results_dir.is_dir() {
        anyhow::bail!("no result store at {}", args.results_dir.display());
    }
    Ok(ResultStore::new(&args.results_dir)?)
}
