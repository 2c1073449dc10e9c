//! panelcube CLI
//!
//! - `build`: run the two-pass densification into a `.npy` directory container
//! - `inspect`: print the manifest and axis labels of a finished container

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};

use panelcube_ingest::layout::{COLUMN_LABELS, CORE_ARRAY, KEY_VALUES, TIME_VALUES};
use panelcube_ingest::{build_cube_dir, CubeConfig, DuplicatePolicy, OrderingPolicy, TimeOrder};
use panelcube_store::{read_manifest, read_string_dataset, DatasetKind, NumericType};

#[derive(Parser)]
#[command(name = "panelcube")]
#[command(
    author,
    version,
    about = "panelcube: dense key × time × feature cubes from panel files"
)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a cube from one or more delimited files.
    ///
    /// Files are processed in the order given; that order decides key
    /// positions. Each key's rows must be contiguous across the inputs.
    Build(BuildArgs),

    /// Show the layout and labels of a built cube.
    Inspect {
        /// Container directory
        dir: PathBuf,
        /// Maximum number of labels to print per axis
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Input files, in processing order (repeat, or pass a space-separated list)
    #[arg(short = 'f', long = "input-file-names", num_args = 1.., value_delimiter = ' ')]
    inputs: Vec<PathBuf>,
    /// Output container directory
    #[arg(short, long, alias = "output-file-name")]
    output: Option<PathBuf>,
    /// JSON config file; flags given on the command line override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Key column name [default: npi]
    #[arg(long)]
    key_column: Option<String>,
    /// Time column name [default: year]
    #[arg(long)]
    time_column: Option<String>,
    /// Keep the first header cell as is
    #[arg(long)]
    no_strip_header_prefix: bool,
    /// Characters dropped from the first header cell [default: 3]
    #[arg(long)]
    header_prefix_len: Option<usize>,
    /// Element type of the dense array [default: int32]
    #[arg(short, long, alias = "numpy-dtype")]
    dtype: Option<NumericType>,
    /// Column to leave out of the feature axis (repeatable)
    #[arg(long = "ignore-column")]
    ignore_columns: Vec<String>,
    /// Field delimiter [default: ,]
    #[arg(long)]
    delimiter: Option<char>,
    /// Handling of keys whose rows are not contiguous [default: trust]
    #[arg(long, value_enum)]
    ordering: Option<OrderingArg>,
    /// Handling of repeated (key, time) rows [default: overwrite]
    #[arg(long, value_enum)]
    duplicates: Option<DuplicatesArg>,
    /// Ordering of the time axis [default: lexicographic]
    #[arg(long, value_enum)]
    time_order: Option<TimeOrderArg>,
    /// Log progress every N rows of a file [default: 5000]
    #[arg(long)]
    progress_interval: Option<u64>,
    /// Replace an existing output directory
    #[arg(long)]
    force: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderingArg {
    Trust,
    Verify,
}

#[derive(Clone, Copy, ValueEnum)]
enum DuplicatesArg {
    Overwrite,
    Error,
    Accumulate,
}

#[derive(Clone, Copy, ValueEnum)]
enum TimeOrderArg {
    Lexicographic,
    Numeric,
}

impl BuildArgs {
    fn into_config(self) -> Result<CubeConfig> {
        let mut config = match &self.config {
            Some(path) => CubeConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => CubeConfig::default(),
        };

        if !self.inputs.is_empty() {
            config.inputs = self.inputs;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(key) = self.key_column {
            config.key_column = key;
        }
        if let Some(time) = self.time_column {
            config.time_column = time;
        }
        if self.no_strip_header_prefix {
            config.strip_header_prefix = false;
        }
        if let Some(len) = self.header_prefix_len {
            config.header_prefix_len = len;
        }
        if let Some(dtype) = self.dtype {
            config.dtype = dtype;
        }
        if !self.ignore_columns.is_empty() {
            config.ignore_columns = self.ignore_columns;
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        if let Some(ordering) = self.ordering {
            config.ordering = match ordering {
                OrderingArg::Trust => OrderingPolicy::Trust,
                OrderingArg::Verify => OrderingPolicy::Verify,
            };
        }
        if let Some(duplicates) = self.duplicates {
            config.duplicates = match duplicates {
                DuplicatesArg::Overwrite => DuplicatePolicy::Overwrite,
                DuplicatesArg::Error => DuplicatePolicy::Error,
                DuplicatesArg::Accumulate => DuplicatePolicy::Accumulate,
            };
        }
        if let Some(order) = self.time_order {
            config.time_order = match order {
                TimeOrderArg::Lexicographic => TimeOrder::Lexicographic,
                TimeOrderArg::Numeric => TimeOrder::Numeric,
            };
        }
        if let Some(every) = self.progress_interval {
            config.progress_interval = every;
        }
        if self.force {
            config.overwrite_output = true;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Build(args) => cmd_build(args.into_config()?),
        Commands::Inspect { dir, limit } => cmd_inspect(&dir, limit),
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        tracing::Level::WARN
    } else {
        match verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_build(config: CubeConfig) -> Result<()> {
    println!(
        "{} {} input file(s) into {}",
        "Building".green().bold(),
        config.inputs.len(),
        config.output.display()
    );

    let (root, summary) = build_cube_dir(&config).context("building cube")?;

    let [keys, times, features] = summary.shape();
    println!("  {} keys:     {keys}", "→".cyan());
    println!("  {} times:    {times}", "→".cyan());
    println!("  {} features: {features}", "→".cyan());
    println!(
        "  {} {} rows into {} blocks ({})",
        "→".cyan(),
        summary.densify.rows,
        summary.densify.blocks_flushed,
        summary.dtype
    );
    if summary.densify.blocks_rewritten > 0 {
        println!(
            "  {} {} key block(s) were written more than once; input is not grouped by key",
            "warning:".yellow().bold(),
            summary.densify.blocks_rewritten
        );
    }
    if summary.densify.duplicates > 0 {
        println!(
            "  {} {} repeated (key, time) row(s)",
            "→".yellow(),
            summary.densify.duplicates
        );
    }
    println!("{} {}", "wrote".green().bold(), root.display().to_string().bold());
    Ok(())
}

fn cmd_inspect(dir: &Path, limit: usize) -> Result<()> {
    let manifest =
        read_manifest(dir).with_context(|| format!("reading manifest of {}", dir.display()))?;

    println!("{} {}", "Container".green().bold(), dir.display());
    for entry in &manifest.datasets {
        let kind = match entry.spec.kind {
            DatasetKind::Numeric { dtype } => dtype.to_string(),
            DatasetKind::FixedString { width } => format!("S{width}"),
        };
        println!("  {} {} {:?} {}", "→".cyan(), entry.path, entry.spec.shape, kind);
    }

    for (title, path) in [
        ("keys", KEY_VALUES),
        ("times", TIME_VALUES),
        ("columns", COLUMN_LABELS),
    ] {
        if manifest.dataset(path).is_none() {
            continue;
        }
        let (_, values) = read_string_dataset(dir, path)
            .with_context(|| format!("reading {path} from {}", dir.display()))?;
        let shown: Vec<&str> = values.iter().take(limit).map(String::as_str).collect();
        let more = values.len().saturating_sub(shown.len());
        let suffix = if more > 0 {
            format!(" (+{more} more)")
        } else {
            String::new()
        };
        println!("{} {}{}", format!("{title}:").bold(), shown.join(", "), suffix);
    }

    if let Some(core) = manifest.dataset(CORE_ARRAY) {
        println!("{} {:?}", "cube shape:".bold(), core.spec.shape);
    }
    Ok(())
}
