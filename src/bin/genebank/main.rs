//! Binary entry point for the genebank index tool.
#![forbid(unsafe_code)]

mod config;
mod ui;

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use genebank::btree::{TreeReport, VerifyReport, DEFAULT_CACHE_SIZE};
use genebank::cli::{
    init_logging, run_build_with_progress, run_dump, run_search, run_search_with, run_stats,
    run_verify, BuildConfig, BuildReport, CliError, SearchConfig, SearchHit, SearchReport, EXIT_IO,
    EXIT_OK, EXIT_USAGE,
};
use serde::Serialize;
use tracing::debug;

use config::CliConfig;
use ui::{format_duration, Ui};

#[derive(Parser, Debug)]
#[command(
    name = "genebank",
    version,
    about = "Build and query disk-resident B-tree indexes of GenBank k-mers",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        help = "Log verbosity: 0 warn, 1 info, 2 debug, 3 trace (RUST_LOG wins)"
    )]
    debug: Option<u8>,

    #[arg(
        long,
        global = true,
        env = "GENEBANK_CONFIG",
        value_name = "FILE",
        help = "CLI config file (defaults to <config dir>/genebank/cli.toml)"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_enum,
        help = "Output format for structured responses [default: text]"
    )]
    format: Option<OutputFormat>,

    #[arg(
        long,
        short,
        global = true,
        help = "Suppress status lines and spinners"
    )]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Index every k-mer of a GenBank file")]
    Create(CreateCmd),

    #[command(about = "Print the frequency of each query sequence found in an index")]
    Search(SearchCmd),

    #[command(about = "List stored keys in order, or the node layout with --shape")]
    Dump {
        #[arg(value_name = "BTREE")]
        btree: PathBuf,
        #[arg(long, help = "Print one line per node instead of one per key")]
        shape: bool,
    },

    #[command(about = "Report index geometry and counters")]
    Stats {
        #[arg(value_name = "BTREE")]
        btree: PathBuf,
    },

    #[command(about = "Check the structural invariants of an index")]
    Verify {
        #[arg(value_name = "BTREE")]
        btree: PathBuf,
    },
}

#[derive(Args, Debug)]
struct CreateCmd {
    #[arg(
        value_name = "DEGREE",
        allow_negative_numbers = true,
        help = "Minimum degree; 0 picks the largest node fitting a 4 KiB page"
    )]
    degree: i64,

    #[arg(value_name = "GBK", help = "GenBank flat file")]
    gbk: PathBuf,

    #[arg(
        value_name = "LENGTH",
        allow_negative_numbers = true,
        help = "Bases per key (1-31)"
    )]
    length: i64,

    #[arg(
        long,
        value_name = "NODES",
        help = "LRU cache size in nodes (0 disables)"
    )]
    cache_size: Option<usize>,

    #[arg(
        long,
        short,
        value_name = "FILE",
        help = "Index path (defaults to <GBK>.btree.data.<LENGTH>.<DEGREE>)"
    )]
    output: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "dump",
        help = "Also write '<frequency> <key>' lines (bare flag writes ./dump)"
    )]
    dump: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SearchCmd {
    #[arg(value_name = "BTREE", help = "Index built by `create`")]
    btree: PathBuf,

    #[arg(value_name = "QUERY", help = "One sequence per line")]
    query: PathBuf,

    #[arg(
        long,
        value_name = "NODES",
        help = "LRU cache size in nodes (0 disables)"
    )]
    cache_size: Option<usize>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(if err.use_stderr() { EXIT_USAGE } else { EXIT_OK });
        }
    };
    let ui = Ui::new(cli.quiet);
    let code = match run(cli, &ui) {
        Ok(code) => code,
        Err(err) => {
            ui.error(&err.to_string());
            err.exit_code()
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli, ui: &Ui) -> Result<i32, CliError> {
    let config = CliConfig::load(cli.config).map_err(|err| CliError::Usage(err.to_string()))?;
    init_logging(cli.debug.or(config.debug_level()).unwrap_or(0))?;
    if let Some(path) = config.path() {
        debug!(path = %path.display(), "config.resolved");
    }
    let format = cli.format.or(config.format()).unwrap_or(OutputFormat::Text);
    let default_cache = config.cache_size().unwrap_or(DEFAULT_CACHE_SIZE);

    match cli.command {
        Command::Create(cmd) => {
            let cfg = BuildConfig {
                degree: cmd.degree,
                gbk_path: cmd.gbk,
                key_len: cmd.length,
                cache_size: cmd.cache_size.unwrap_or(default_cache),
                output: cmd.output,
                dump: cmd.dump,
            };
            let task = ui.task(format!("indexing {}", cfg.gbk_path.display()));
            let report = run_build_with_progress(&cfg, |kmers| {
                task.progress(format!("{kmers} k-mers"));
            })?;
            let elapsed = task.finish();
            emit(format, &report, || print_build_text(ui, &report, elapsed))?;
        }
        Command::Search(cmd) => {
            let cfg = SearchConfig {
                btree_path: cmd.btree,
                query_path: cmd.query,
                cache_size: cmd.cache_size.unwrap_or(default_cache),
            };
            match format {
                OutputFormat::Text => {
                    let stdout = io::stdout();
                    let mut out = BufWriter::new(stdout.lock());
                    let report = run_search(&cfg, &mut out)?;
                    out.flush()?;
                    print_search_text(ui, &report);
                }
                OutputFormat::Json => {
                    let mut hits = Vec::new();
                    let report = run_search_with(&cfg, |hit| {
                        hits.push(hit);
                        Ok(())
                    })?;
                    emit(format, &SearchOutput { hits, report }, || {})?;
                }
            }
        }
        Command::Dump { btree, shape } => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            run_dump(&btree, shape, &mut out)?;
            out.flush()?;
        }
        Command::Stats { btree } => {
            let report = run_stats(&btree)?;
            emit(format, &report, || print_stats_text(ui, &report))?;
        }
        Command::Verify { btree } => {
            let report = run_verify(&btree)?;
            emit(format, &report, || print_verify_text(ui, &report))?;
            if !report.success {
                return Ok(EXIT_IO);
            }
        }
    }
    Ok(EXIT_OK)
}

#[derive(Serialize)]
struct SearchOutput {
    hits: Vec<SearchHit>,
    report: SearchReport,
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), CliError>
where
    T: Serialize,
    F: FnOnce(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value).map_err(io::Error::from)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn print_build_text(ui: &Ui, report: &BuildReport, elapsed: std::time::Duration) {
    ui.success(&format!(
        "indexed {} k-mers ({} distinct) into {} in {}",
        report.kmers,
        report.distinct_keys,
        report.output.display(),
        format_duration(elapsed)
    ));
    ui.info(&format!(
        "degree={} key_len={} nodes={} height={}",
        report.degree, report.key_len, report.node_count, report.height
    ));
    if let Some(dump) = &report.dump {
        ui.info(&format!("dump written to {}", dump.display()));
    }
}

fn print_search_text(ui: &Ui, report: &SearchReport) {
    ui.info(&format!(
        "{} queries: {} found, {} absent, {} skipped",
        report.queries, report.hits, report.misses, report.skipped
    ));
    if report.skipped > 0 {
        ui.warn("some query lines were not valid sequences; rerun with --debug 1 for details");
    }
}

fn print_stats_text(ui: &Ui, report: &TreeReport) {
    ui.section(
        "Index",
        [
            ("path", report.path.clone()),
            ("degree", report.degree.to_string()),
            ("key_len", report.key_len.to_string()),
            ("node_len", report.node_len.to_string()),
            ("nodes", report.node_count.to_string()),
            ("root", report.root_offset.to_string()),
            ("file_len", report.file_len.to_string()),
            ("height", report.height.to_string()),
        ],
    );
    ui.section(
        "Contents",
        [
            ("distinct_keys", report.distinct_keys),
            ("occurrences", report.total_occurrences),
        ],
    );
    ui.section(
        "I/O",
        [
            ("node_reads", report.ops.node_reads),
            ("cache_hits", report.cache.hits),
            ("cache_misses", report.cache.misses),
        ],
    );
}

fn print_verify_text(ui: &Ui, report: &VerifyReport) {
    let depth = report
        .leaf_depth
        .map_or_else(|| "?".to_string(), |d| d.to_string());
    ui.section(
        "Verify",
        [
            ("success", report.success.to_string()),
            ("nodes", report.nodes_visited.to_string()),
            ("keys", report.distinct_keys.to_string()),
            ("occurrences", report.total_occurrences.to_string()),
            ("leaf_depth", depth),
        ],
    );
    ui.list("Findings", report.findings.iter().cloned());
}
