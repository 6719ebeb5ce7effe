//! CLI entry point for `mailindex`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use mailindex::config::Config;
use mailindex::index::stats;
use mailindex::parser::date::parse_cutoff;
use mailindex::parser::HeaderPolicy;
use mailindex::{CorpusSource, IngestReport, Message, ParticipantIndex};

#[derive(Parser)]
#[command(
    name = "mailindex",
    version,
    about = "Ingest a directory of plain-text email and query it by participant"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Maximum number of files to ingest (0-100000)
    #[arg(short, long, global = true, value_name = "N")]
    max: Option<usize>,

    /// Header order policy: strict or scan
    #[arg(long, global = true, value_name = "POLICY")]
    policy: Option<HeaderPolicy>,

    /// Only read files whose name ends with SUFFIX
    #[arg(long, global = true, value_name = "SUFFIX")]
    suffix: Option<String>,

    /// Join folded header lines before parsing
    #[arg(long, global = true)]
    unfold: bool,

    /// Index senders only (recipients are not searchable)
    #[arg(long, global = true)]
    sender_only: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Messages sent or received by ADDRESS before a cutoff, newest first
    Search {
        root: PathBuf,
        address: String,
        /// Exclusive cutoff: RFC 3339, a Date: header value, or YYYY-MM-DD
        #[arg(short, long, value_name = "TIME")]
        before: String,
        #[arg(long)]
        json: bool,
    },
    /// A random sample of ingested messages
    Sample {
        root: PathBuf,
        count: usize,
        #[arg(long)]
        json: bool,
    },
    /// Show corpus statistics
    Stats {
        root: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML
    Config {
        /// Save it to the config file instead
        #[arg(long)]
        write: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration, then let flags override it
    let (mut config, origin) = mailindex::config::load_config();
    apply_overrides(&mut config, &cli);

    let log_level = match cli.verbose {
        0 => config.general.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    setup_logging(&log_level, &config);
    origin.log();

    match cli.command {
        Commands::Search {
            root,
            address,
            before,
            json,
        } => cmd_search(&root, &address, &before, json, &config),
        Commands::Sample { root, count, json } => cmd_sample(&root, count, json, &config),
        Commands::Stats { root, json } => cmd_stats(&root, json, &config),
        Commands::Config { write } => cmd_config(write, &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(max) = cli.max {
        config.ingest.max_messages = max;
    }
    if let Some(policy) = cli.policy {
        config.ingest.header_policy = policy;
    }
    if cli.suffix.is_some() {
        config.corpus.file_suffix = cli.suffix.clone();
    }
    if cli.unfold {
        config.ingest.unfold_continuations = true;
    }
    if cli.sender_only {
        config.ingest.index_recipients = false;
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_path = mailindex::config::log_file_path(config);
    let log_dir = mailindex::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_name = log_path.file_name().unwrap_or_default();
        let file_appender = tracing_appender::rolling::never(&log_dir, file_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Walk the corpus and build the index, showing a spinner.
fn load_index(root: &Path, config: &Config) -> anyhow::Result<(ParticipantIndex, IngestReport)> {
    // Reject a bad bound before touching the disk
    mailindex::ingest::validate_max_count(config.ingest.max_messages)?;

    let source = CorpusSource::new(root)
        .with_suffix(config.corpus.file_suffix.clone())
        .follow_links(config.corpus.follow_links);
    let messages = source.iter()?;
    tracing::info!(root = %source.root().display(), "Ingesting corpus");

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} Ingesting {pos} file(s) ({elapsed})")
            .expect("valid template"),
    );

    let mut index = ParticipantIndex::with_recipients(config.ingest.index_recipients);
    let report = mailindex::ingest(
        &mut index,
        messages,
        config.ingest.max_messages,
        &config.ingest.options(),
        Some(&|consumed: usize| pb.set_position(consumed as u64)),
    )?;

    pb.finish_and_clear();
    Ok((index, report))
}

/// Search an address and print its messages.
fn cmd_search(
    root: &Path,
    address: &str,
    before: &str,
    json: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let cutoff = parse_cutoff(before)?;
    let (index, _report) = load_index(root, config)?;
    let results = index.search(address, &cutoff)?;

    if json {
        print_messages_json(&results)?;
    } else {
        print_messages_table(&results);
    }
    Ok(())
}

/// Print a random sample of messages.
fn cmd_sample(root: &Path, count: usize, json: bool, config: &Config) -> anyhow::Result<()> {
    let (index, _report) = load_index(root, config)?;
    let results = index.sample(count)?;

    if json {
        print_messages_json(&results)?;
    } else {
        print_messages_table(&results);
    }
    Ok(())
}

/// Show statistics for a corpus.
fn cmd_stats(root: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let start = Instant::now();
    let (index, report) = load_index(root, config)?;
    let elapsed = start.elapsed();

    if json {
        print_stats_json(root, &index, &report, elapsed)?;
    } else {
        print_stats_table(root, &index, &report, elapsed);
    }
    Ok(())
}

fn cmd_config(write: bool, config: &Config) -> anyhow::Result<()> {
    if write {
        mailindex::config::save_config(config)?;
        if let Some(path) = mailindex::config::config_file_path() {
            println!("  Wrote {}", path.display());
        }
    } else {
        print!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailindex", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Cut `s` to at most `width` terminal columns.
fn truncate(s: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out
}

/// Truncate and pad `s` to exactly `width` terminal columns.
fn fit(s: &str, width: usize) -> String {
    let cut = truncate(s, width);
    let pad = width.saturating_sub(cut.width());
    format!("{cut}{}", " ".repeat(pad))
}

/// Print messages as a human-readable table.
fn print_messages_table(messages: &[&Message]) {
    println!();
    println!("  {} result(s)", messages.len());
    println!();

    if messages.is_empty() {
        return;
    }

    println!(
        "  {:<4} {:<22} {:<28} {:<28} {}",
        "#", "Date", "From", "To", "Subject"
    );
    println!("  {}", "-".repeat(110));

    for (i, message) in messages.iter().enumerate() {
        let date = message.sent_time().format("%Y-%m-%d %H:%M %z").to_string();
        let to = message.to().join(", ");
        println!(
            "  {:<4} {:<22} {} {} {}",
            i + 1,
            date,
            fit(message.from(), 28),
            fit(&to, 28),
            truncate(message.subject(), 40)
        );
    }
    println!();
}

/// Print messages as JSON.
fn print_messages_json(messages: &[&Message]) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "result_count": messages.len(),
        "results": messages,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Print statistics in a human-readable table.
fn print_stats_table(
    root: &Path,
    index: &ParticipantIndex,
    report: &IngestReport,
    elapsed: Duration,
) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  {:<20} {}", "Corpus", root.display());
    println!("  {:<20} {}", "Files read", report.consumed);
    println!("  {:<20} {}", "Text size", format_size(report.bytes, BINARY));
    println!("  {:<20} {}", "Messages indexed", report.indexed);
    println!("  {:<20} {}", "Skipped", report.skipped);
    println!("  {:<20} {}", "Addresses", index.participant_count());

    if let Some((min, max)) = stats::date_range(index) {
        println!(
            "  {:<20} {} to {}",
            "Date range",
            min.format("%Y-%m-%d"),
            max.format("%Y-%m-%d")
        );
    }

    println!("  {:<20} {:.2?}", "Ingestion time", elapsed);

    let top = stats::top_senders(index, 10);
    if !top.is_empty() {
        println!();
        println!("  Top senders:");
        for (sender, count) in &top {
            println!("    {count:>6}  {sender}");
        }
    }

    if index.indexes_recipients() {
        let top = stats::top_participants(index, 10);
        if !top.is_empty() {
            println!();
            println!("  Most active addresses:");
            for (address, count) in &top {
                println!("    {count:>6}  {address}");
            }
        }
    }
    println!();
}

/// Print statistics as JSON.
fn print_stats_json(
    root: &Path,
    index: &ParticipantIndex,
    report: &IngestReport,
    elapsed: Duration,
) -> anyhow::Result<()> {
    let date_range = stats::date_range(index).map(|(min, max)| {
        serde_json::json!({
            "oldest": min.to_rfc3339(),
            "newest": max.to_rfc3339(),
        })
    });

    let ranked = |rows: Vec<(String, usize)>| -> Vec<serde_json::Value> {
        rows.into_iter()
            .map(|(address, count)| {
                serde_json::json!({
                    "address": address,
                    "count": count,
                })
            })
            .collect()
    };

    let output = serde_json::json!({
        "corpus": root.to_string_lossy(),
        "ingest": report,
        "address_count": index.participant_count(),
        "date_range": date_range,
        "ingest_time_ms": elapsed.as_millis(),
        "top_senders": ranked(stats::top_senders(index, 10)),
        "top_participants": ranked(stats::top_participants(index, 10)),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
