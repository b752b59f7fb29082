use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use faceval::{config, dataset, eval, report, Pipeline};
use log::info;

#[derive(Parser)]
#[command(name = "faceval")]
#[command(
    version,
    about = "One-shot face recognition accuracy over a person-per-folder dataset"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DatasetArgs {
    /// Dataset root with one subfolder of .jpg images per person
    #[arg(short, long)]
    dataset: Option<PathBuf>,
    /// Config file (defaults to faceval.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed references and queries, then report nearest-reference accuracy
    Eval {
        #[command(flatten)]
        args: DatasetArgs,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
        /// Also print per-person results
        #[arg(short, long)]
        verbose: bool,
    },
    /// Show how the dataset splits into references and queries
    Scan {
        #[command(flatten)]
        args: DatasetArgs,
    },
    /// Write the default config file
    InitConfig {
        /// Destination (defaults to faceval.toml)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Eval {
            args,
            json,
            verbose,
        } => run_eval(&args, json, verbose),
        Commands::Scan { args } => run_scan(&args),
        Commands::InitConfig { path } => init_config(path),
    }
}

fn resolve(args: &DatasetArgs) -> Result<config::Config> {
    let mut cfg = config::load_config(args.config.as_deref())?;
    if let Some(dataset) = &args.dataset {
        cfg.dataset = dataset.clone();
    }
    Ok(cfg)
}

fn run_eval(args: &DatasetArgs, json: bool, verbose: bool) -> Result<()> {
    let cfg = resolve(args)?;
    info!("Scanning dataset: {}", cfg.dataset.display());
    let split = dataset::scan(&cfg.dataset)?;

    let mut pipeline = Pipeline::new(&cfg.pipeline_options())
        .context("Failed to initialize face recognition pipeline")?;

    let report = match eval::evaluate(&mut pipeline, &split) {
        Ok(report) => report,
        Err(err) => match report::early_exit_message(&err) {
            Some(message) => {
                println!("{}", message);
                std::process::exit(1);
            }
            None => return Err(err),
        },
    };

    if json {
        println!("{}", report::to_json(&report)?);
        return Ok(());
    }
    if verbose {
        print!("{}", report::per_person_table(&report));
    }
    println!("{}", report::accuracy_line(&report));
    Ok(())
}

fn run_scan(args: &DatasetArgs) -> Result<()> {
    let cfg = resolve(args)?;
    let split = dataset::scan(&cfg.dataset)?;
    let summary = split.summary();
    println!("persons:    {}", summary.persons);
    println!("references: {}", summary.references);
    println!("queries:    {}", summary.queries);
    println!("skipped:    {}", summary.skipped);
    Ok(())
}

fn init_config(path: Option<PathBuf>) -> Result<()> {
    let cfg = config::Config::default();
    config::save_config(&cfg, path.as_deref()).context("Failed to write config")?;
    info!(
        "✓ Wrote default config to {}",
        path.as_deref()
            .unwrap_or(&config::CONFIG_PATH)
            .display()
    );
    Ok(())
}
