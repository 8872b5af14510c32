//! `pdfjornada`: pull employee names and weekly hours out of PDF files.
//!
//! Reads every PDF given on the command line, sends their combined text to
//! the Gemini API for structured extraction, and prints the resulting
//! table. When stdout is a terminal the table is pretty-printed as
//! markdown via `bat`; when piped, tab-separated text is emitted. The
//! table can also be exported as a PDF report.

#![allow(clippy::redundant_pub_crate)]

mod classify;
mod config;
mod error;
mod extract;
mod logging;
mod model;
mod pdf;
mod render;
mod report;
mod session;

use config::ExtractorConfig;
use error::Error;
use extract::GeminiExtractor;
use logging::Verbosity;
use model::RunStatus;
use pdf::PdfReader;
use session::Session;

use bat::{Input, PrettyPrinter};
use is_terminal::IsTerminal;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use tokio::sync::watch;

const USAGE: &str = "\
pdfjornada - extract employee names and weekly hours from PDF files

Usage: pdfjornada [OPTIONS] FILE.pdf...

Options:
  -p, --plain         Force plain text output (tab-separated, no decorations)
  -m, --markdown      Output as markdown (default when terminal detected)
  -j, --json          Output the records as JSON
  -e, --export        Write the PDF report to datos_extraidos.pdf
  -o, --output FILE   Write the PDF report to FILE
  -v, --verbose       Log progress to stderr (repeat for more detail)
  -h, --help          Show this help

All files are read, their text is combined, and a single request is sent
to the Gemini API. Rows with weekly hours of 16 or less, or 35 or more,
are marked NOT APPLICABLE.

Environment:
  GEMINI_API_KEY (or API_KEY)   API key, required
  PDFJORNADA_MODEL              model name (default gemini-2.5-flash)
  PDFJORNADA_ENDPOINT           API base URL
  PDFJORNADA_TIMEOUT_SECS       request timeout (default 120)";

/// Output mode selection.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    /// Detect automatically: markdown to terminal, plain text when piped.
    Auto,
    /// Force plain text output.
    Plain,
    /// Force markdown output.
    Markdown,
    /// Records as JSON.
    Json,
}

/// Parsed command line.
#[derive(Debug)]
struct Options {
    mode: Mode,
    files: Vec<String>,
    report: Option<PathBuf>,
    verbosity: Verbosity,
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = match parse_args(&args) {
        Ok(Some(opts)) => opts,
        Ok(None) => {
            println!("{USAGE}");
            return;
        }
        Err(msg) => {
            eprintln!("pdfjornada: {msg}");
            eprintln!("{USAGE}");
            process::exit(2);
        }
    };

    logging::init_tracing(opts.verbosity);

    if let Err(e) = run(&opts) {
        eprintln!("pdfjornada: {e}");
        process::exit(1);
    }
}

/// Parse arguments. `Ok(None)` means help was requested.
fn parse_args(args: &[String]) -> Result<Option<Options>, String> {
    let mut opts = Options {
        mode: Mode::Auto,
        files: Vec::new(),
        report: None,
        verbosity: Verbosity::default(),
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "-p" | "--plain" => opts.mode = Mode::Plain,
            "-m" | "--markdown" => opts.mode = Mode::Markdown,
            "-j" | "--json" => opts.mode = Mode::Json,
            "-e" | "--export" => {
                opts.report = Some(PathBuf::from(report::DEFAULT_REPORT_NAME));
            }
            "-o" | "--output" => {
                let path = iter
                    .next()
                    .ok_or_else(|| format!("{arg} requires a file name"))?;
                opts.report = Some(PathBuf::from(path));
            }
            "-v" | "--verbose" => opts.verbosity = opts.verbosity.increase(),
            "-vv" => opts.verbosity = Verbosity::Debug,
            s if s.starts_with("--output=") => {
                opts.report = Some(PathBuf::from(&s["--output=".len()..]));
            }
            s if s.starts_with('-') => return Err(format!("unknown option: {s}")),
            _ => opts.files.push(arg.clone()),
        }
    }

    if opts.files.is_empty() {
        return Err("no PDF files given".into());
    }
    Ok(Some(opts))
}

fn run(opts: &Options) -> error::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let extractor = GeminiExtractor::new(ExtractorConfig::from_env())?;
    let session = Session::new(PdfReader, extractor);
    for file in &opts.files {
        session.add_file(file)?;
    }
    tracing::debug!(files = ?session.file_names(), "selection ready");

    let show_status = io::stderr().is_terminal();
    let status_rx = session.subscribe();
    let (status, ()) = runtime.block_on(async {
        tokio::join!(session.run(), follow_status(status_rx, show_status))
    });

    match status {
        RunStatus::Done => {}
        RunStatus::Error => {
            let message = session
                .error_message()
                .unwrap_or_else(|| "unknown error during processing".into());
            return Err(Error::Run(message));
        }
        RunStatus::Idle | RunStatus::Reading | RunStatus::Analyzing => return Ok(()),
    }

    let records = session.records().unwrap_or_default();
    let file_names = session.run_file_names();
    print_results(&records, &file_names, opts.mode)?;

    if let Some(path) = &opts.report {
        if records.is_empty() {
            tracing::warn!("no records found; report not written");
        } else {
            report::write_report(&records, path)?;
            eprintln!("pdfjornada: report written to {}", path.display());
        }
    }
    Ok(())
}

/// Print a status line for each active stage until the run settles.
async fn follow_status(mut rx: watch::Receiver<RunStatus>, show: bool) {
    while rx.changed().await.is_ok() {
        let status = *rx.borrow_and_update();
        if show {
            if let Some(line) = render::status_line(status) {
                eprintln!("{line}");
            }
        }
        if !status.is_active() {
            break;
        }
    }
}

fn print_results(
    records: &[model::EmployeeRecord],
    file_names: &[String],
    mode: Mode,
) -> error::Result<()> {
    let is_tty = io::stdout().is_terminal();
    match mode {
        Mode::Json => {
            let json = render::render_json(records)
                .map_err(|e| Error::Render(e.to_string()))?;
            io::stdout().write_all(json.as_bytes())?;
        }
        Mode::Plain => {
            io::stdout().write_all(render::render_plain(records, file_names).as_bytes())?;
        }
        Mode::Markdown => {
            let md = render::render_markdown(records, file_names);
            if is_tty {
                pretty_print(&md)?;
            } else {
                io::stdout().write_all(md.as_bytes())?;
            }
        }
        Mode::Auto => {
            if is_tty {
                pretty_print(&render::render_markdown(records, file_names))?;
            } else {
                io::stdout().write_all(render::render_plain(records, file_names).as_bytes())?;
            }
        }
    }
    Ok(())
}

fn pretty_print(content: &str) -> error::Result<()> {
    let input = Input::from_bytes(content.as_bytes())
        .name("pdfjornada.md")
        .title("Datos extraídos");

    let theme = std::env::var("BAT_THEME").unwrap_or_else(|_| "ansi".to_string());

    PrettyPrinter::new()
        .input(input)
        .language("Markdown")
        .theme(&theme)
        .header(true)
        .line_numbers(false)
        .grid(true)
        .colored_output(true)
        .true_color(true)
        .paging_mode(bat::PagingMode::QuitIfOneScreen)
        .print()
        .map_err(|e| Error::Render(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn parses_files_and_modes() {
        let opts = parse_args(&args(&["-p", "a.pdf", "b.pdf"])).unwrap().unwrap();
        assert_eq!(opts.mode, Mode::Plain);
        assert_eq!(opts.files, vec!["a.pdf", "b.pdf"]);
        assert!(opts.report.is_none());
    }

    #[test]
    fn export_uses_default_name() {
        let opts = parse_args(&args(&["-e", "a.pdf"])).unwrap().unwrap();
        assert_eq!(opts.report, Some(PathBuf::from("datos_extraidos.pdf")));
    }

    #[test]
    fn output_takes_a_path() {
        let opts = parse_args(&args(&["-o", "out.pdf", "a.pdf"])).unwrap().unwrap();
        assert_eq!(opts.report, Some(PathBuf::from("out.pdf")));
        assert_eq!(opts.files, vec!["a.pdf"]);

        let opts = parse_args(&args(&["--output=r.pdf", "a.pdf"])).unwrap().unwrap();
        assert_eq!(opts.report, Some(PathBuf::from("r.pdf")));

        assert!(parse_args(&args(&["a.pdf", "-o"])).is_err());
    }

    #[test]
    fn verbosity_accumulates() {
        let opts = parse_args(&args(&["-v", "-v", "a.pdf"])).unwrap().unwrap();
        assert_eq!(opts.verbosity, Verbosity::Debug);
    }

    #[test]
    fn help_and_errors() {
        assert!(parse_args(&args(&["--help"])).unwrap().is_none());
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["--bogus", "a.pdf"])).is_err());
    }
}
