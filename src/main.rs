//! # Quartermaster Command Line
//!
//! Loads a catalog, presets, bot templates and an optional configuration,
//! generates one or more inventories for a role and prints them as JSON.

use clap::Parser;
use log::{error, info};
use quartermaster::{
    config::MAX_BATCH_SIZE, generation::utils::create_rng, BotInventoryGenerator, BotTemplate,
    GenerationConfig, GenerationRequest, ItemCatalog, PresetBook, QuartermasterError,
    QuartermasterResult,
};
use std::path::PathBuf;

/// Command line arguments for quartermaster.
#[derive(Parser, Debug)]
#[command(name = "quartermaster")]
#[command(about = "Generates bot inventories from a catalog and role templates")]
#[command(version)]
struct Args {
    /// Item catalog (JSON array of templates)
    #[arg(long)]
    catalog: PathBuf,

    /// Weapon presets (JSON array)
    #[arg(long)]
    presets: PathBuf,

    /// Bot template file (one template or an array)
    #[arg(long)]
    template: PathBuf,

    /// Generation configuration; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Role to generate; defaults to the first template's role
    #[arg(short, long)]
    role: Option<String>,

    /// Random seed for reproducible output
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of bots to generate
    #[arg(short = 'n', long, default_value_t = 1)]
    count: u32,

    /// Generate high-value (PMC-style) bots
    #[arg(long)]
    high_value: bool,

    /// Bot level
    #[arg(long, default_value_t = 1)]
    level: u32,

    /// Log level (error, warn, info, debug, trace); RUST_LOG overrides it
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() {
    let args = Args::parse();
    initialize_logging(&args.log_level);

    if let Err(e) = run(&args) {
        error!("{}", e);
        eprintln!("quartermaster: {}", e);
        std::process::exit(1);
    }
}

/// Initializes env_logger with `log_level` unless `RUST_LOG` is set.
fn initialize_logging(log_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_target(false)
        .init();
}

fn run(args: &Args) -> QuartermasterResult<()> {
    info!("Starting quartermaster v{}", quartermaster::VERSION);

    if args.count == 0 || args.count > MAX_BATCH_SIZE {
        return Err(QuartermasterError::Configuration(format!(
            "count must be between 1 and {}",
            MAX_BATCH_SIZE
        )));
    }

    let catalog = ItemCatalog::load(&args.catalog)?;
    let presets = PresetBook::load(&args.presets)?;
    let templates = BotTemplate::load_all(&args.template)?;
    let config = match &args.config {
        Some(path) => GenerationConfig::load(path)?,
        None => GenerationConfig::new(),
    };
    info!(
        "Loaded {} templates, {} presets, {} bot templates",
        catalog.len(),
        presets.len(),
        templates.len()
    );

    let role = match &args.role {
        Some(role) => role.clone(),
        None => templates
            .first()
            .map(|template| template.role.clone())
            .ok_or_else(|| {
                QuartermasterError::Configuration("template file contains no bots".to_string())
            })?,
    };

    let generator = BotInventoryGenerator::new(catalog, presets, templates, config);
    let mut request = GenerationRequest::new(role);
    request.level = args.level;
    if args.high_value {
        request = request.high_value();
    }

    let mut rng = create_rng(args.seed);
    let inventories = (0..args.count)
        .map(|_| generator.generate_inventory(&request, &mut rng))
        .collect::<QuartermasterResult<Vec<_>>>()?;

    let output = if args.pretty {
        serde_json::to_string_pretty(&inventories)?
    } else {
        serde_json::to_string(&inventories)?
    };
    println!("{}", output);
    Ok(())
}
