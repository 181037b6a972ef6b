use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};
use image_grouper_core::conditions::{
    CameraSense, Condition, MatchSummary, ShapeTolerance, TimeWindow,
};
use image_grouper_core::config::LogLevel;
use image_grouper_core::persistence::SqliteHashCache;
use image_grouper_core::{Config, Grouping, ImageGrouper, LoadReport};
use log::{info, LevelFilter};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "image-grouper")]
#[command(about = "Group similar images by perceptual hash, colour, time, camera and shape")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan files and directories and print groups of similar images
    Scan {
        /// Files or directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Search directories recursively
        #[arg(short, long)]
        recursive: bool,

        /// Group by gradient hash, with this distance limit (1-50)
        #[arg(long, value_name = "LIMIT")]
        gradients: Option<u32>,

        /// Gradient hash method (Horizontal, Vertical)
        #[arg(long, value_name = "METHOD")]
        gradient_method: Option<String>,

        /// Group by colour distance, with this limit (1-50)
        #[arg(long, value_name = "LIMIT")]
        color: Option<u32>,

        /// Colour hash method (hsv, hsv5, rgb, rgb5, luminosity, luminosity5)
        #[arg(long, value_name = "METHOD")]
        color_method: Option<String>,

        /// Group by capture time within a window (1m, 10m, 1h, 1d, 1w, 4w, 1y)
        #[arg(long, value_name = "WINDOW")]
        time: Option<TimeWindow>,

        /// Group by camera model (same or different)
        #[arg(long, value_name = "SENSE")]
        camera: Option<CameraSense>,

        /// Group by picture shape (different, orientation, exact, 5, 10, 20, 30, 50)
        #[arg(long, value_name = "TOLERANCE")]
        shape: Option<ShapeTolerance>,

        /// Let images without a capture time or camera model match
        #[arg(long)]
        include_missing: bool,

        /// Make an enabled condition obligatory (gradients, colordistance,
        /// closeintime, cameramodel, pictureshape)
        #[arg(long, value_name = "NAME")]
        must_match: Vec<String>,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Do not use the persistent hash cache
        #[arg(long)]
        no_cache: bool,

        /// Empty the persistent hash cache before scanning
        #[arg(long)]
        clear_cache: bool,

        /// Draw progress bars for long batch operations
        #[arg(long)]
        progress: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Write logs to grouper.log in this directory instead of stderr
        #[arg(long, value_name = "DIR")]
        log_dir: Option<PathBuf>,

        /// Verbosity level
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "image-grouper.json")]
        path: PathBuf,
    },
}

/// Condition settings taken from the command line
struct ConditionArgs {
    gradients: Option<u32>,
    gradient_method: Option<String>,
    color: Option<u32>,
    color_method: Option<String>,
    time: Option<TimeWindow>,
    camera: Option<CameraSense>,
    shape: Option<ShapeTolerance>,
    include_missing: bool,
    must_match: Vec<String>,
}

#[derive(Serialize)]
struct ConditionReport {
    name: &'static str,
    label: String,
    must_match: bool,
    summary: Option<MatchSummary>,
}

#[derive(Serialize)]
struct ScanReport {
    load: LoadReport,
    conditions: Vec<ConditionReport>,
    /// Present when no condition was enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<PathBuf>>,
    groups: Vec<Vec<PathBuf>>,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            paths,
            recursive,
            gradients,
            gradient_method,
            color,
            color_method,
            time,
            camera,
            shape,
            include_missing,
            must_match,
            config,
            no_cache,
            clear_cache,
            progress,
            json,
            log_dir,
            verbose,
        } => {
            // Set up configuration
            let mut config = match config {
                Some(config_path) => Config::from_file(&config_path)?,
                None => Config::default(),
            };

            // Override config with command line arguments
            config.search_subfolders |= recursive;
            config.show_progress |= progress;
            if no_cache {
                config.use_cache = false;
            }
            config.log_level = match verbose {
                0 => config.log_level,
                1 => LogLevel::Debug,
                _ => LogLevel::Trace,
            };
            config.validate()?;

            init_logging(log_dir.as_deref(), config.log_level.to_level_filter())?;

            if clear_cache {
                if let Some(cache_path) = &config.cache_path {
                    let removed = SqliteHashCache::open(cache_path)?.clear()?;
                    info!("Cleared {} cached hash values", removed);
                }
            }

            let mut grouper = ImageGrouper::new(config)?;
            let load = grouper.load(&paths)?;

            let args = ConditionArgs {
                gradients,
                gradient_method,
                color,
                color_method,
                time,
                camera,
                shape,
                include_missing,
                must_match,
            };
            configure_conditions(&mut grouper, args)?;

            info!("Starting image grouping...");
            let grouping = grouper.recompute()?;
            info!("Grouping complete");

            let report = build_report(&grouper, load, grouping);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(())
        }

        Commands::GenerateConfig { path } => {
            let config = Config::default();
            config.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(())
        }
    }
}

fn init_logging(log_dir: Option<&std::path::Path>, level: LevelFilter) -> anyhow::Result<()> {
    match log_dir {
        Some(dir) => image_grouper_core::logging::init_logger(dir, level)
            .map_err(|e| anyhow!("Failed to initialize logging: {}", e)),
        None => {
            env_logger::Builder::new()
                .filter_level(level)
                .parse_env("GROUPER_LOG")
                .init();
            Ok(())
        }
    }
}

fn configure_conditions(grouper: &mut ImageGrouper, args: ConditionArgs) -> anyhow::Result<()> {
    let conditions = grouper.conditions_mut();

    if args.gradients.is_some() || args.gradient_method.is_some() {
        let criterion = conditions.gradients.criterion_mut();
        if let Some(limit) = args.gradients {
            criterion.set_limit(limit)?;
        }
        if let Some(method) = &args.gradient_method {
            criterion.set_method_by_name(method)?;
        }
        conditions.gradients.set_active(true);
    }

    if args.color.is_some() || args.color_method.is_some() {
        let criterion = conditions.color.criterion_mut();
        if let Some(limit) = args.color {
            criterion.set_limit(limit)?;
        }
        if let Some(method) = &args.color_method {
            criterion.set_method_by_name(method)?;
        }
        conditions.color.set_active(true);
    }

    if let Some(window) = args.time {
        let criterion = conditions.time.criterion_mut();
        criterion.set_window(window);
        criterion.set_include_missing(args.include_missing);
        conditions.time.set_active(true);
    }

    if let Some(sense) = args.camera {
        let criterion = conditions.camera.criterion_mut();
        criterion.set_sense(sense);
        criterion.set_include_missing(args.include_missing);
        conditions.camera.set_active(true);
    }

    if let Some(tolerance) = args.shape {
        conditions.shape.criterion_mut().set_tolerance(tolerance)?;
        conditions.shape.set_active(true);
    }

    for name in &args.must_match {
        let condition = grouper
            .condition_mut(name)
            .ok_or_else(|| anyhow!("Unknown condition '{}'", name))?;
        if !condition.is_active() {
            bail!("Condition '{}' must be enabled to be obligatory", name);
        }
        condition.set_must_match(true);
    }
    Ok(())
}

fn build_report(grouper: &ImageGrouper, load: LoadReport, grouping: Grouping) -> ScanReport {
    let conditions = grouper
        .conditions()
        .iter()
        .filter(|condition| condition.is_active())
        .map(|condition| ConditionReport {
            name: condition.name(),
            label: condition.label(),
            must_match: condition.must_match(),
            summary: condition.summary(),
        })
        .collect();

    match grouping {
        Grouping::Unfiltered(identities) => ScanReport {
            load,
            conditions,
            images: Some(
                identities
                    .iter()
                    .flat_map(|identity| grouper.paths(identity))
                    .collect(),
            ),
            groups: Vec::new(),
        },
        Grouping::Groups(groups) => ScanReport {
            load,
            conditions,
            images: None,
            groups: grouper.group_paths(&groups),
        },
    }
}

fn print_report(report: &ScanReport) {
    println!(
        "Scanned {} files: {} images ({} exact copies), {} skipped",
        report.load.files, report.load.images, report.load.duplicates, report.load.skipped
    );

    for condition in &report.conditions {
        let obligatory = if condition.must_match { " [must match]" } else { "" };
        match &condition.summary {
            Some(summary) => println!("  {}{} {}", condition.label, obligatory, summary),
            None => println!("  {}{}", condition.label, obligatory),
        }
    }

    if let Some(images) = &report.images {
        println!("No conditions enabled; {} images:", images.len());
        for path in images {
            println!("  {}", path.display());
        }
        return;
    }

    if report.groups.is_empty() {
        println!("No groups found");
        return;
    }
    for (index, group) in report.groups.iter().enumerate() {
        println!("Group {} ({} files):", index + 1, group.len());
        for path in group {
            println!("  {}", path.display());
        }
    }
}
