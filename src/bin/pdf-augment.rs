//! CLI binary for pdf-augmenter.
//!
//! With `--mode` it runs one extraction and prints the items. Without it,
//! it drops into a small prompt driving a single `ExtractionSession`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_augmenter::viewer::{render_item, save_image};
use pdf_augmenter::{
    load_candidate, AugmenterBackend, AugmenterError, ClientConfig, Endpoint, ExtractedItem,
    ExtractionMode, ExtractionSession, HttpBackend, Notice, NoticeLevel, SelectedFile,
    SessionObserver, SessionStatus, TableCase,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Spinner shown while a request is outstanding. Hidden when `enabled` is false.
fn spinner(enabled: bool, prefix: &str, message: String) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS),
    );
    bar.set_prefix(prefix.to_string());
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

// ── Notices ──────────────────────────────────────────────────────────────────

/// Prints session notices to stderr.
struct CliObserver {
    quiet: bool,
}

impl SessionObserver for CliObserver {
    fn on_notice(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Success if !self.quiet => {
                eprintln!("{} {}", green("✔"), notice.message)
            }
            NoticeLevel::Success => {}
            NoticeLevel::Error => eprintln!("{} {}", red("✘"), red(&notice.message)),
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Interactive session
  pdf-augment report.pdf

  # Extract tables with context (case 2)
  pdf-augment report.pdf --mode tables --case 2

  # Images as JSON, decoded files written to ./figures
  pdf-augment report.pdf --mode images --json -o figures

  # Formulas from a URL against a remote backend
  pdf-augment https://arxiv.org/pdf/1706.03762 --mode formulas \
      --api-url http://augmenter.internal:8000

  # Old single-endpoint table extraction
  pdf-augment report.pdf --legacy

TABLE CASES:
  1  Table Data Only            /extract-description/first-case/tables
  2  Before and after context   /extract-description/second-case/tables
  3  References + Title         /extract-description/tables

ENVIRONMENT VARIABLES:
  PDF_AUGMENTER_API_URL   Backend base URL (default http://localhost:8000)
  PDF_AUGMENTER_TIMEOUT   Request timeout in seconds (default: none)
  RUST_LOG                Override log filter
"#;

const REPL_HELP: &str = "COMMANDS:
  file <path|url>      select a PDF
  mode <kind>          tables | images | formulas
  case <1|2|3>         table case (tables only)
  process              run the extraction
  next / prev          move through the results
  show                 print the displayed item
  close / open         hide or re-open the viewer
  chat                 open the question panel for the displayed item
  ask <question>       ask about the displayed item
  suggest <n>          ask suggested question n
  history              print this panel's questions and answers
  save [dir]           write the displayed image to disk
  clear                forget the file and results
  status               show the session state
  help                 this text
  quit                 leave";

/// Extract tables, images and formulas from PDFs with generated descriptions.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-augment",
    version,
    about = "Extract tables, images and formulas from PDFs with generated descriptions",
    long_about = "Upload a PDF to a pdf-augmenter backend and browse what it finds: tables \
(with one of three context strategies), images or formulas, each with a generated \
description. Ask follow-up questions about any item.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: Option<String>,

    /// What to extract: tables, images, formulas. Runs once and exits.
    #[arg(short, long, env = "PDF_AUGMENTER_MODE")]
    mode: Option<ExtractionMode>,

    /// Table case: 1, 2 or 3.
    #[arg(short, long, env = "PDF_AUGMENTER_CASE")]
    case: Option<TableCase>,

    /// Use the old single table endpoint (tables only, no case).
    #[arg(long)]
    legacy: bool,

    /// Print results as JSON instead of text.
    #[arg(long, env = "PDF_AUGMENTER_JSON")]
    json: bool,

    /// Write decoded images into this directory.
    #[arg(short, long, env = "PDF_AUGMENTER_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Backend base URL.
    #[arg(long, env = "PDF_AUGMENTER_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// Request timeout in seconds (default: none).
    #[arg(long, env = "PDF_AUGMENTER_TIMEOUT")]
    timeout: Option<u64>,

    /// HTTP download timeout in seconds, for URL inputs.
    #[arg(long, env = "PDF_AUGMENTER_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable the spinner.
    #[arg(long, env = "PDF_AUGMENTER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF_AUGMENTER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, env = "PDF_AUGMENTER_QUIET")]
    quiet: bool,
}

impl Cli {
    fn show_progress(&self) -> bool {
        !self.quiet && !self.no_progress && !self.json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || cli.show_progress() {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build client ─────────────────────────────────────────────────────
    let mut builder = ClientConfig::builder()
        .base_url(&cli.api_url)
        .download_timeout_secs(cli.download_timeout);
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    let config = builder.build().context("Invalid configuration")?;
    let backend = Arc::new(HttpBackend::new(config).context("Failed to build HTTP client")?);

    if cli.legacy {
        return run_legacy(&cli, backend.as_ref()).await;
    }

    let observer = Arc::new(CliObserver {
        quiet: cli.quiet || cli.json,
    });
    let mut session = ExtractionSession::with_observer(backend, observer);

    match cli.mode {
        Some(mode) => run_once(&cli, &mut session, mode).await,
        None => run_repl(&cli, &mut session).await,
    }
}

// ── One-shot ─────────────────────────────────────────────────────────────────

async fn run_once(cli: &Cli, session: &mut ExtractionSession, mode: ExtractionMode) -> Result<()> {
    let input = cli
        .input
        .as_deref()
        .context("--mode needs an INPUT file or URL")?;
    let candidate = load_candidate(input, cli.download_timeout)
        .await
        .context("Failed to load input")?;
    session.select(Some(candidate))?;
    session.set_mode(mode)?;
    if let Some(case) = cli.case {
        session.set_table_case(case)?;
    }

    match run_process(session, cli.show_progress()).await? {
        SessionStatus::Results => {
            let stem = file_stem(session.file());
            print_items(session.results(), cli.json, cli.output_dir.as_deref(), &stem).await
        }
        SessionStatus::Empty => {
            if cli.json {
                println!("[]");
            }
            Ok(())
        }
        SessionStatus::Error => bail!("Extraction failed"),
        _ => Ok(()),
    }
}

async fn run_legacy(cli: &Cli, backend: &HttpBackend) -> Result<()> {
    if matches!(cli.mode, Some(mode) if mode != ExtractionMode::Tables) {
        bail!("--legacy only extracts tables");
    }
    let input = cli
        .input
        .as_deref()
        .context("--legacy needs an INPUT file or URL")?;
    let candidate = load_candidate(input, cli.download_timeout)
        .await
        .context("Failed to load input")?;
    let file = SelectedFile::try_from(candidate).context("Please upload a valid PDF file.")?;

    let endpoint = Endpoint::LegacyTables;
    let bar = spinner(
        cli.show_progress(),
        "Extracting",
        format!("tables from {} via {}", file.name(), endpoint),
    );
    let result = backend.extract(endpoint, &file).await;
    bar.finish_and_clear();

    let items = result.context("Processing failed.")?;
    if items.is_empty() {
        eprintln!("{} {}", red("✘"), red("No tables found."));
        if cli.json {
            println!("[]");
        }
        return Ok(());
    }
    let stem = file_stem(Some(&file));
    print_items(&items, cli.json, cli.output_dir.as_deref(), &stem).await
}

/// Run the session's extraction with a spinner. Ctrl-C abandons the request.
async fn run_process(
    session: &mut ExtractionSession,
    progress: bool,
) -> Result<SessionStatus, AugmenterError> {
    let ticket = session.begin_process()?;
    let backend = Arc::clone(session.backend());
    let bar = spinner(
        progress,
        "Extracting",
        format!(
            "{} from {} via {}",
            ticket.mode(),
            ticket.file().name(),
            ticket.endpoint()
        ),
    );

    let outcome = tokio::select! {
        result = backend.extract(ticket.endpoint(), ticket.file()) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    bar.finish_and_clear();

    match outcome {
        Some(result) => Ok(session.complete_process(ticket, result)),
        None => {
            session.abandon_process(ticket);
            eprintln!("{}", dim("Cancelled."));
            Ok(session.status())
        }
    }
}

async fn print_items(
    items: &[ExtractedItem],
    json: bool,
    output_dir: Option<&Path>,
    stem: &str,
) -> Result<()> {
    if json {
        let json = serde_json::to_string_pretty(items).context("Failed to serialise results")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        for (i, item) in items.iter().enumerate() {
            writeln!(handle, "{}", render_item(item, i, items.len()))
                .context("Failed to write to stdout")?;
        }
    }

    if let Some(dir) = output_dir {
        for (i, item) in items.iter().enumerate() {
            if let ExtractedItem::Image(image) = item {
                match save_image(image, dir, stem, i).await {
                    Ok(path) => eprintln!("{} {}", green("✔"), bold(&path.display().to_string())),
                    Err(e) => eprintln!("{} {}", red("✘"), e),
                }
            }
        }
    }
    Ok(())
}

fn file_stem(file: Option<&SelectedFile>) -> String {
    file.and_then(|f| Path::new(f.name()).file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

// ── Interactive ──────────────────────────────────────────────────────────────

async fn run_repl(cli: &Cli, session: &mut ExtractionSession) -> Result<()> {
    eprintln!(
        "{} {}",
        bold("pdf-augment"),
        dim("type `help` for commands, `quit` to leave")
    );

    if let Some(input) = &cli.input {
        select_input(session, input, cli.download_timeout).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("{} ", cyan(&prompt(session)));
        io::stderr().flush().ok();

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };

        match command {
            "quit" | "exit" | "q" => break,
            "help" | "?" => eprintln!("{REPL_HELP}"),
            _ => {
                if let Err(e) = run_command(cli, session, command, arg).await {
                    eprintln!("{} {}", red("✘"), e);
                }
            }
        }
    }
    Ok(())
}

fn prompt(session: &ExtractionSession) -> String {
    let mut parts = Vec::new();
    if let Some(file) = session.file() {
        parts.push(file.name().to_string());
    }
    match (session.mode(), session.table_case()) {
        (Some(mode), Some(case)) => parts.push(format!("{mode}/{case}")),
        (Some(mode), None) => parts.push(mode.to_string()),
        _ => {}
    }
    let viewer = session.viewer();
    if viewer.is_open() {
        parts.push(format!("{}/{}", viewer.index() + 1, viewer.len()));
    }
    if session.chat().is_some() {
        parts.push("chat".to_string());
    }
    if parts.is_empty() {
        ">".to_string()
    } else {
        format!("[{}]>", parts.join(" "))
    }
}

async fn select_input(session: &mut ExtractionSession, input: &str, timeout: u64) {
    match load_candidate(input, timeout).await {
        Ok(candidate) => {
            let _ = session.select(Some(candidate));
        }
        Err(e) => eprintln!("{} {}", red("✘"), e),
    }
}

fn show_current(session: &ExtractionSession) {
    match session.viewer().render_current() {
        Some(text) => println!("{text}"),
        None => eprintln!("{}", dim("Nothing is displayed.")),
    }
}

/// Run one prompt command. Session refusals have already raised a notice,
/// so their errors are dropped here.
async fn run_command(
    cli: &Cli,
    session: &mut ExtractionSession,
    command: &str,
    arg: &str,
) -> Result<()> {
    match command {
        "file" => {
            if arg.is_empty() {
                let _ = session.select(None);
            } else {
                select_input(session, arg, cli.download_timeout).await;
            }
        }
        "mode" => {
            let mode: ExtractionMode = arg.parse().map_err(anyhow::Error::msg)?;
            if session.set_mode(mode).is_ok() && mode.requires_case() {
                for case in TableCase::ALL {
                    eprintln!("  {}  {}", case.number(), dim(case.label()));
                }
            }
        }
        "case" => {
            let case: TableCase = arg.parse().map_err(anyhow::Error::msg)?;
            if let Ok(false) = session.set_table_case(case) {
                eprintln!("{}", dim("The case only applies to tables."));
            }
        }
        "process" => {
            if let Ok(SessionStatus::Results) = run_process(session, cli.show_progress()).await {
                show_current(session);
            }
        }
        "next" | "n" => match session.next() {
            Ok(true) => show_current(session),
            Ok(false) => eprintln!("{}", dim("Already at the last item.")),
            Err(_) => {}
        },
        "prev" | "p" => match session.previous() {
            Ok(true) => show_current(session),
            Ok(false) => eprintln!("{}", dim("Already at the first item.")),
            Err(_) => {}
        },
        "show" => show_current(session),
        "close" => {
            let _ = session.close_viewer();
        }
        "open" => {
            if session.open_viewer().is_ok() {
                show_current(session);
            }
        }
        "chat" => {
            if let Ok(panel) = session.open_chat() {
                eprintln!("{}", bold("Suggested questions:"));
                for (i, q) in panel.suggestions().iter().enumerate() {
                    eprintln!("  {}  {}", i + 1, q);
                }
            }
        }
        "ask" => run_ask(session, arg, cli.show_progress()).await,
        "suggest" => {
            let n: usize = arg.parse().context("Usage: suggest <n>")?;
            let question = session
                .chat()
                .and_then(|panel| n.checked_sub(1).and_then(|i| panel.suggestions().get(i)))
                .copied();
            match question {
                Some(q) => run_ask(session, q, cli.show_progress()).await,
                None => eprintln!("{}", dim("No such suggestion.")),
            }
        }
        "history" => match session.chat() {
            Some(panel) if !panel.transcript().is_empty() => {
                for exchange in panel.transcript() {
                    println!("{} {}", cyan("Q:"), exchange.question);
                    println!("{} {}", green("A:"), exchange.answer);
                }
            }
            Some(_) => eprintln!("{}", dim("No questions asked yet.")),
            None => eprintln!("{}", dim("The question panel is not open.")),
        },
        "save" => {
            let viewer = session.viewer();
            let Some(ExtractedItem::Image(image)) = viewer.current() else {
                bail!("The displayed item is not an image");
            };
            let dir = if arg.is_empty() {
                cli.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
            } else {
                PathBuf::from(arg)
            };
            let stem = file_stem(session.file());
            let path = save_image(image, &dir, &stem, viewer.index()).await?;
            eprintln!("{} {}", green("✔"), bold(&path.display().to_string()));
        }
        "clear" => {
            let _ = session.clear();
        }
        "status" => print_status(session),
        other => bail!("Unknown command '{other}' (try `help`)"),
    }
    Ok(())
}

async fn run_ask(session: &mut ExtractionSession, question: &str, progress: bool) {
    let Ok(ticket) = session.begin_ask(question) else {
        return;
    };
    let backend = Arc::clone(session.backend());
    let bar = spinner(progress, "Asking", ticket.request().question.clone());
    let result = backend.ask(ticket.request()).await;
    bar.finish_and_clear();

    if let Some(exchange) = session.complete_ask(ticket, result) {
        println!("{} {}", cyan("Q:"), exchange.question);
        println!("{} {}", green("A:"), exchange.answer);
    }
}

fn print_status(session: &ExtractionSession) {
    let or_none = |s: Option<String>| s.unwrap_or_else(|| dim("none"));
    eprintln!(
        "File:     {}",
        or_none(session.file().map(|f| f.name().to_string()))
    );
    eprintln!("Mode:     {}", or_none(session.mode().map(|m| m.to_string())));
    eprintln!(
        "Case:     {}",
        or_none(session.table_case().map(|c| format!("{} ({})", c.number(), c.label())))
    );
    eprintln!("Status:   {}", session.status());
    eprintln!("Results:  {}", session.results().len());
    if session.viewer().is_open() {
        eprintln!(
            "Viewing:  {} of {}",
            session.viewer().index() + 1,
            session.viewer().len()
        );
    }
    eprintln!(
        "Process:  {}",
        if session.can_process() {
            green("ready")
        } else {
            dim("not ready")
        }
    );
}
