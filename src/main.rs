#![allow(clippy::too_many_arguments)]

//! dbgtk: colored, linked de Bruijn graph toolkit CLI.

use clap::{Parser, Subcommand};
use dbg_toolkit::commands::build::ColorInput;
use dbg_toolkit::commands::{
    BreakpointsCommand, BubblesCommand, BuildCommand, Calls2VcfCommand, CleanCommand,
    LinksCommand, ReadsCommand, ThreadCommand, VcfcovCommand,
};
use dbg_toolkit::error::GraphError;
use std::path::PathBuf;
use std::process;

/// Default memory budget (§5) when `-m` isn't given: 512 MiB.
const DEFAULT_MEMORY_BYTES: u64 = 512 * 1024 * 1024;

#[derive(Parser)]
#[command(name = "dbgtk")]
#[command(author = "Manish Kumar Bobbili")]
#[command(version)]
#[command(about = "dbgtk: colored, linked de Bruijn graph toolkit", long_about = None)]
struct Cli {
    /// Memory budget for the graph's backing allocation: a byte count, or
    /// a count with a K/M/G suffix.
    #[arg(short = 'm', long = "memory", global = true)]
    memory: Option<String>,

    /// Number of worker threads.
    #[arg(short = 't', long = "threads", global = true, default_value_t = dbg_toolkit::worker_pool::DEFAULT_WORKERS)]
    threads: usize,

    /// k-mer size (build only; ignored by commands that load an existing
    /// graph, which carry their own k in the file header).
    #[arg(short = 'k', long = "kmer-size", global = true, default_value_t = 31)]
    kmer_size: usize,

    /// Output file path.
    #[arg(short = 'o', long = "output", global = true)]
    output: Option<PathBuf>,

    /// Attach a link file to a color: `col:file`. May be repeated, once
    /// per color, for the `links` subcommand.
    #[arg(short = 'p', long = "paths", global = true)]
    paths: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a colored graph from per-color read files.
    Build {
        /// One color's reads: `sample_name:file1,file2,...`. May be
        /// repeated, one occurrence per color, in color order.
        #[arg(long = "color")]
        colors: Vec<String>,
    },

    /// Remove tips and low-coverage unitigs from a graph.
    Clean {
        /// Graph file to clean.
        #[arg(short, long)]
        input: PathBuf,

        /// Hash table capacity to allocate for the loaded graph.
        #[arg(long, default_value_t = 1 << 20)]
        capacity: usize,

        /// Override the derived tip-length threshold.
        #[arg(long)]
        tip_len_threshold: Option<usize>,

        /// Override the derived coverage cutoff.
        #[arg(long)]
        cutoff: Option<u32>,

        /// Write the coverage-before histogram to this CSV path.
        #[arg(long)]
        histogram_csv: Option<PathBuf>,
    },

    /// Thread reads back over a graph to build a link store.
    Thread {
        /// Graph file to thread reads over.
        #[arg(short, long)]
        graph: PathBuf,

        #[arg(long, default_value_t = 1 << 20)]
        capacity: usize,

        /// Color the reads belong to.
        #[arg(long, default_value_t = 0)]
        color: usize,

        /// Read files to thread.
        reads: Vec<PathBuf>,
    },

    /// Threshold-select and prune link tries, writing the cleaned file.
    Links {
        /// Graph the link files were built against.
        #[arg(short, long)]
        graph: PathBuf,

        #[arg(long, default_value_t = 1 << 20)]
        capacity: usize,

        #[arg(long, default_value_t = 1)]
        num_colors: usize,

        #[arg(long, default_value_t = 255)]
        max_threshold: u32,

        #[arg(long, default_value_t = 0)]
        seed: u64,
    },

    /// Emit bubble calls found in a graph.
    Bubbles {
        #[arg(short, long)]
        graph: PathBuf,

        #[arg(long, default_value_t = 1 << 20)]
        capacity: usize,

        #[arg(long, default_value_t = 1)]
        num_colors: usize,

        #[arg(long, default_value_t = 500)]
        max_bubble_len: usize,
    },

    /// Emit breakpoint calls between a reference color and sample colors.
    Breakpoints {
        #[arg(short, long)]
        graph: PathBuf,

        #[arg(long, default_value_t = 1 << 20)]
        capacity: usize,

        #[arg(long, default_value_t = 2)]
        num_colors: usize,

        #[arg(long, default_value_t = 0)]
        ref_color: usize,

        /// Sample colors to compare against the reference. Defaults to
        /// every color except the reference.
        #[arg(long)]
        sample_colors: Vec<usize>,

        #[arg(long, default_value_t = 500)]
        max_walk: usize,
    },

    /// Format bubble and breakpoint calls from a graph as a VCF.
    Calls2vcf {
        #[arg(short, long)]
        graph: PathBuf,

        #[arg(long, default_value_t = 1 << 20)]
        capacity: usize,

        #[arg(long, default_value_t = 2)]
        num_colors: usize,

        #[arg(long, default_value_t = 0)]
        ref_color: usize,

        #[arg(long)]
        sample_colors: Vec<usize>,

        #[arg(long, default_value_t = 500)]
        max_len: usize,
    },

    /// Annotate a VCF with per-color median k-mer coverage.
    Vcfcov {
        #[arg(short, long)]
        graph: PathBuf,

        #[arg(long, default_value_t = 1 << 20)]
        capacity: usize,

        #[arg(long, default_value_t = 1)]
        num_colors: usize,

        /// VCF file to annotate, coordinate-sorted.
        #[arg(short, long)]
        input: PathBuf,

        /// Maximum records buffered at once.
        #[arg(long, default_value_t = 64)]
        max_nvars: usize,
    },

    /// Filter a read file to reads fully represented in a graph color.
    Reads {
        #[arg(short, long)]
        graph: PathBuf,

        #[arg(long, default_value_t = 1 << 20)]
        capacity: usize,

        #[arg(long, default_value_t = 1)]
        num_colors: usize,

        #[arg(long, default_value_t = 0)]
        color: usize,

        #[arg(short, long)]
        input: PathBuf,

        /// Write reads NOT fully represented instead.
        #[arg(long)]
        invert: bool,
    },
}

/// Parse a human-entered size like `512M`, `2G`, or a bare byte count.
fn parse_memory(spec: &str) -> Result<u64, GraphError> {
    let spec = spec.trim();
    let last = spec
        .chars()
        .last()
        .ok_or_else(|| GraphError::InvalidInput("empty --memory value".to_string()))?;
    let (digits, mult) = match last {
        'k' | 'K' => (&spec[..spec.len() - 1], 1024u64),
        'm' | 'M' => (&spec[..spec.len() - 1], 1024 * 1024),
        'g' | 'G' => (&spec[..spec.len() - 1], 1024 * 1024 * 1024),
        _ => (spec, 1),
    };
    digits
        .parse::<u64>()
        .map(|n| n * mult)
        .map_err(|e| GraphError::InvalidInput(format!("invalid --memory value {spec:?}: {e}")))
}

fn parse_color_attachment(spec: &str) -> Result<(usize, PathBuf), GraphError> {
    let (col, path) = spec
        .split_once(':')
        .ok_or_else(|| GraphError::InvalidInput(format!("expected col:file, got {spec:?}")))?;
    let col: usize = col
        .parse()
        .map_err(|e| GraphError::InvalidInput(format!("bad color index {col:?}: {e}")))?;
    Ok((col, PathBuf::from(path)))
}

fn require_output(cli: &Cli) -> Result<PathBuf, GraphError> {
    cli.output
        .clone()
        .ok_or_else(|| GraphError::InvalidInput("--output is required".to_string()))
}

fn run_build(cli: &Cli, colors: &[String]) -> Result<(), GraphError> {
    let memory = cli
        .memory
        .as_deref()
        .map(parse_memory)
        .transpose()?
        .unwrap_or(DEFAULT_MEMORY_BYTES);
    let output = require_output(cli)?;

    let mut inputs = Vec::with_capacity(colors.len());
    for spec in colors {
        let (name, files) = spec
            .split_once(':')
            .ok_or_else(|| GraphError::InvalidInput(format!("expected name:files, got {spec:?}")))?;
        inputs.push(ColorInput {
            sample_name: name.to_string(),
            paths: files.split(',').map(PathBuf::from).collect(),
        });
    }
    if inputs.is_empty() {
        return Err(GraphError::InvalidInput("at least one --color is required".to_string()));
    }

    BuildCommand {
        k: cli.kmer_size,
        memory_bytes: memory,
        colors: inputs,
        output,
    }
    .run()
}

fn run_clean(
    cli: &Cli,
    input: PathBuf,
    capacity: usize,
    tip_len_threshold: Option<usize>,
    cutoff: Option<u32>,
    histogram_csv: Option<PathBuf>,
) -> Result<(), GraphError> {
    CleanCommand {
        input,
        output: require_output(cli)?,
        capacity,
        tip_len_threshold,
        cutoff,
        histogram_csv,
    }
    .run()
}

fn run_thread(cli: &Cli, graph_path: PathBuf, capacity: usize, color: usize, reads: Vec<PathBuf>) -> Result<(), GraphError> {
    ThreadCommand {
        graph_path,
        capacity,
        color,
        reads,
        output: require_output(cli)?,
    }
    .run()
}

fn run_links(cli: &Cli, graph_path: PathBuf, capacity: usize, num_colors: usize, max_threshold: u32, seed: u64) -> Result<(), GraphError> {
    let output = require_output(cli)?;
    let mut link_paths = Vec::with_capacity(cli.paths.len());
    for spec in &cli.paths {
        let (_, path) = parse_color_attachment(spec)?;
        link_paths.push(path);
    }
    LinksCommand {
        graph_path,
        capacity,
        num_colors_hint: num_colors,
        link_paths,
        output,
        max_threshold,
        seed,
    }
    .run()
}

fn run_bubbles(cli: &Cli, graph_path: PathBuf, capacity: usize, num_colors: usize, max_bubble_len: usize) -> Result<(), GraphError> {
    BubblesCommand {
        graph_path,
        capacity,
        num_colors_hint: num_colors,
        max_bubble_len,
        output: require_output(cli)?,
    }
    .run()
}

fn run_breakpoints(
    cli: &Cli,
    graph_path: PathBuf,
    capacity: usize,
    num_colors: usize,
    ref_color: usize,
    sample_colors: Vec<usize>,
    max_walk: usize,
) -> Result<(), GraphError> {
    let output = require_output(cli)?;
    let sample_colors = if sample_colors.is_empty() {
        (0..num_colors).filter(|&c| c != ref_color).collect()
    } else {
        sample_colors
    };
    BreakpointsCommand {
        graph_path,
        capacity,
        num_colors_hint: num_colors,
        ref_color,
        sample_colors,
        max_walk,
        output,
    }
    .run()
}

fn run_calls2vcf(
    cli: &Cli,
    graph_path: PathBuf,
    capacity: usize,
    num_colors: usize,
    ref_color: usize,
    sample_colors: Vec<usize>,
    max_len: usize,
) -> Result<(), GraphError> {
    let output = require_output(cli)?;
    let sample_colors = if sample_colors.is_empty() {
        (0..num_colors).filter(|&c| c != ref_color).collect()
    } else {
        sample_colors
    };
    Calls2VcfCommand {
        graph_path,
        capacity,
        num_colors_hint: num_colors,
        ref_color,
        sample_colors,
        max_len,
        output,
    }
    .run()
}

fn run_vcfcov(cli: &Cli, graph_path: PathBuf, capacity: usize, num_colors: usize, input: PathBuf, max_nvars: usize) -> Result<(), GraphError> {
    VcfcovCommand {
        graph_path,
        capacity,
        num_colors_hint: num_colors,
        input,
        output: require_output(cli)?,
        max_nvars,
    }
    .run()
}

fn run_reads(
    cli: &Cli,
    graph_path: PathBuf,
    capacity: usize,
    num_colors: usize,
    color: usize,
    input: PathBuf,
    invert: bool,
) -> Result<(), GraphError> {
    ReadsCommand {
        graph_path,
        capacity,
        num_colors_hint: num_colors,
        color,
        input,
        output: require_output(cli)?,
        invert,
        workers: cli.threads,
    }
    .run()
}

/// No partial output survives a failed run.
fn delete_on_error(output: &Option<PathBuf>) {
    if let Some(path) = output {
        let _ = std::fs::remove_file(path);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads)
        .build_global()
        .expect("failed to initialize thread pool");

    let output_for_cleanup = cli.output.clone();
    let result = match &cli.command {
        Commands::Build { colors } => run_build(&cli, colors),
        Commands::Clean {
            input,
            capacity,
            tip_len_threshold,
            cutoff,
            histogram_csv,
        } => run_clean(&cli, input.clone(), *capacity, *tip_len_threshold, *cutoff, histogram_csv.clone()),
        Commands::Thread { graph, capacity, color, reads } => run_thread(&cli, graph.clone(), *capacity, *color, reads.clone()),
        Commands::Links {
            graph,
            capacity,
            num_colors,
            max_threshold,
            seed,
        } => run_links(&cli, graph.clone(), *capacity, *num_colors, *max_threshold, *seed),
        Commands::Bubbles {
            graph,
            capacity,
            num_colors,
            max_bubble_len,
        } => run_bubbles(&cli, graph.clone(), *capacity, *num_colors, *max_bubble_len),
        Commands::Breakpoints {
            graph,
            capacity,
            num_colors,
            ref_color,
            sample_colors,
            max_walk,
        } => run_breakpoints(&cli, graph.clone(), *capacity, *num_colors, *ref_color, sample_colors.clone(), *max_walk),
        Commands::Calls2vcf {
            graph,
            capacity,
            num_colors,
            ref_color,
            sample_colors,
            max_len,
        } => run_calls2vcf(&cli, graph.clone(), *capacity, *num_colors, *ref_color, sample_colors.clone(), *max_len),
        Commands::Vcfcov {
            graph,
            capacity,
            num_colors,
            input,
            max_nvars,
        } => run_vcfcov(&cli, graph.clone(), *capacity, *num_colors, input.clone(), *max_nvars),
        Commands::Reads {
            graph,
            capacity,
            num_colors,
            color,
            input,
            invert,
        } => run_reads(&cli, graph.clone(), *capacity, *num_colors, *color, input.clone(), *invert),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        delete_on_error(&output_for_cleanup);
        process::exit(1);
    }
}
