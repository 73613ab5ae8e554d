//! curvescope - Main Entry Point
//!
//! Headless front end over the library: imports measurement files and prints
//! summaries, sync offsets and value-row trends.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use curvescope::{
    analysis::{
        axes::y_axis_layout,
        stats::format_significant,
        sync::{common_y_axes, compute_sync_offsets, SyncMode, SyncRequest},
        values::{correlate, row_trends, ValueKind, ValueRowKey},
    },
    cancel::CancelToken,
    config::AppConfig,
    import::{expand_paths, ImportPool},
    types::ImportedFile,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "curvescope")]
#[command(about = "Inspect, synchronize and compare measurement curve files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print header, channel and axis summary of each file
    Inspect {
        /// Files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Compute per-file X offsets
    Sync {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// xmin, xmax or ythreshold (defaults to the configured mode)
        #[arg(short, long)]
        mode: Option<SyncMode>,
        /// Y axis name or channel description of the master channel
        #[arg(long)]
        master: String,
        /// X axis the master channel must use (defaults to the first one found)
        #[arg(long)]
        x_axis: Option<String>,
        /// Y value to align on in ythreshold mode
        #[arg(short, long)]
        threshold: Option<f64>,
    },
    /// Statistics of set/actual value rows across files
    Trend {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// set or actual
        #[arg(short, long, default_value = "set")]
        kind: ValueKind,
        /// Only this row number
        #[arg(short, long)]
        row: Option<i64>,
        /// Correlate --row against this row number
        #[arg(long, requires = "row")]
        against: Option<i64>,
        /// Histogram bin count (2-100)
        #[arg(short, long)]
        bins: Option<usize>,
    },
}

fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let (file_layer, guard) = match &config.logging.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.logging.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,curvescope=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

fn import(config: &AppConfig, paths: &[PathBuf]) -> Result<Vec<ImportedFile>> {
    let files = expand_paths(paths, &config.import.extensions).context("collecting input files")?;
    if files.is_empty() {
        bail!("no input files found");
    }

    let pool = ImportPool::new(&config.import);
    let report = pool.submit(files, CancelToken::new()).wait();
    for skip in &report.skipped {
        eprintln!("skipped {}: {}", skip.path.display(), skip.reason);
    }

    let mut imported = report.files;
    imported.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(imported)
}

fn inspect(files: &[ImportedFile]) {
    for file in files {
        println!("{}", file.filename);
        let header = &file.header;
        if !header.title.is_empty() {
            println!("  title:    {}", header.title);
        }
        if !header.date.is_empty() {
            println!("  date:     {}", header.date);
        }
        if !header.ident_string.is_empty() {
            println!("  ident:    {}", header.ident_string);
        }
        if header.marked_as_nok {
            println!("  marked NOK");
        }
        println!(
            "  {} channels, {} set values, {} actual values",
            file.channels.len(),
            file.set_values.len(),
            file.actual_values.len()
        );
        for channel in &file.channels {
            println!(
                "    {:<24} {} over {} ({} points)",
                channel.description,
                channel.y_axis.label(),
                channel.x_axis.label(),
                channel.no_of_points()
            );
        }
    }

    let layout = y_axis_layout(files.iter().flat_map(|f| f.channels.iter()));
    println!();
    println!("Y axes:");
    for axis in layout {
        println!(
            "  {:<20} [{}] {} channels, x {}..{}, y {}..{}",
            axis.name,
            axis.unit,
            axis.channels.len(),
            axis.range.min_x,
            axis.range.max_x,
            axis.range.min_y,
            axis.range.max_y
        );
    }
}

fn sync(
    config: &AppConfig,
    files: &[ImportedFile],
    mode: Option<SyncMode>,
    master: String,
    x_axis: Option<String>,
    threshold: Option<f64>,
) -> Result<()> {
    let mode = mode.unwrap_or(config.sync.mode);
    if mode == SyncMode::Off {
        bail!("no sync mode given (use --mode or set sync.mode in the config)");
    }

    let active_x_axis = match x_axis {
        Some(axis) => axis,
        None => files
            .iter()
            .flat_map(|f| f.x_axis_names())
            .next()
            .context("no X axis found in the input files")?,
    };

    if mode == SyncMode::YThreshold && !common_y_axes(files).contains(&master) {
        tracing::warn!("'{}' is not a Y axis of every file", master);
    }

    let request = SyncRequest {
        mode,
        master_axis: master,
        active_x_axis,
        threshold: threshold.unwrap_or(config.sync.threshold),
    };
    let outcome = compute_sync_offsets(
        files,
        &request,
        |p| tracing::debug!("sync {}/{}: {}", p.current, p.total, p.label),
        &CancelToken::new(),
    );

    println!(
        "{} sync on '{}' over '{}'",
        request.mode.display_name(),
        request.master_axis,
        request.active_x_axis
    );
    for file in files {
        let offset = outcome.offsets.get(&file.id).copied().unwrap_or(0.0);
        println!("  {:<32} {:>14.6}", file.filename, offset);
    }
    for error in &outcome.errors {
        eprintln!("warning: {}", error);
    }
    Ok(())
}

fn trend(
    config: &AppConfig,
    files: &[ImportedFile],
    kind: ValueKind,
    row: Option<i64>,
    against: Option<i64>,
    bins: Option<usize>,
) -> Result<()> {
    let bins = bins.unwrap_or_else(|| config.analysis.bins());
    let batch = row_trends(
        files,
        kind,
        bins,
        |p| tracing::debug!("trend {}/{}: {}", p.current, p.total, p.label),
        &CancelToken::new(),
    );

    let rows: Vec<_> = batch
        .rows
        .iter()
        .filter(|t| row.map_or(true, |r| t.key.row_number == r))
        .collect();
    if rows.is_empty() {
        bail!("no active {} value rows found", kind);
    }

    for trend in rows {
        println!("{} {} [{}]", trend.key, trend.description, trend.unit);
        let Some(stats) = trend.stats else {
            println!("  no numeric values");
            continue;
        };
        println!(
            "  n={} min={} max={} mean={} std={}",
            stats.count, stats.min, stats.max, stats.mean, stats.std_dev
        );
        for bin in &trend.histogram {
            println!(
                "  {:>12} {:>4} {}",
                format_significant(bin.lower, config.analysis.label_precision),
                bin.count(),
                "#".repeat(bin.count())
            );
        }
    }

    if let (Some(a), Some(b)) = (row, against) {
        let correlation = correlate(
            files,
            ValueRowKey::new(kind, a),
            ValueRowKey::new(kind, b),
        );
        println!();
        println!("{} pairs", correlation.pairs.len());
        match correlation.r {
            Some(r) => println!("pearson r = {:.6}", r),
            None => println!("pearson r undefined"),
        }
        match correlation.regression {
            Some(reg) => println!("y = {:.6} * x + {:.6}", reg.slope, reg.intercept),
            None => println!("regression undefined"),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.as_deref());
    let _guard = init_logging(&config);

    tracing::info!("Starting curvescope");

    match cli.command {
        Commands::Inspect { paths } => {
            let files = import(&config, &paths)?;
            inspect(&files);
        }
        Commands::Sync {
            paths,
            mode,
            master,
            x_axis,
            threshold,
        } => {
            let files = import(&config, &paths)?;
            sync(&config, &files, mode, master, x_axis, threshold)?;
        }
        Commands::Trend {
            paths,
            kind,
            row,
            against,
            bins,
        } => {
            let files = import(&config, &paths)?;
            trend(&config, &files, kind, row, against, bins)?;
        }
    }

    Ok(())
}
