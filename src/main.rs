//! csv-sieve CLI - inspect delimited files and infer column formats

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use csv_sieve::{
    DatePreference, DetectionOptions, DialectBuilder, EncodingChoice, FormatHints, GuessResult,
    Inspection, Inspector, SieveError, TextEncoding, parse_delimiter, parse_quote,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Tolerant delimited-text reader with column format inference.
///
/// Reads each file with the given dialect, samples every column and reports
/// the inferred format together with any row diagnostics.
#[derive(Parser, Debug)]
#[command(name = "csv-sieve")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file(s) to inspect
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Field delimiter: a single character or a name like Tab, Semicolon, Pipe
    #[arg(short = 'd', long, default_value = ",")]
    delimiter: String,

    /// Quote character (single character, 'double', 'single' or 'none')
    #[arg(short = 'q', long, default_value = "\"")]
    quote: String,

    /// Escape character
    #[arg(short = 'e', long)]
    escape: Option<char>,

    /// Skip lines starting with this prefix
    #[arg(short = 'c', long)]
    comment: Option<String>,

    /// The first row is data, not column names
    #[arg(long)]
    no_header: bool,

    /// Lines to skip before the header
    #[arg(long, default_value = "0")]
    skip_rows: usize,

    /// Fold line breaks into short rows (for hard-wrapped exports)
    #[arg(long)]
    row_combining: bool,

    /// Merge surplus fields into the last column instead of dropping them
    #[arg(long)]
    solve_more_columns: bool,

    /// Encoding label (e.g. windows-1252, utf-16le); used when there is no BOM
    #[arg(long)]
    encoding: Option<String>,

    /// Use --encoding even when the file has a different BOM
    #[arg(long, requires = "encoding")]
    force_encoding: bool,

    /// Treat this literal as a null value
    #[arg(long)]
    null: Option<String>,

    /// Number of non-null values sampled per column (default: 200)
    #[arg(short = 'n', long, default_value = "200")]
    sample_size: usize,

    /// Maximum records scanned while sampling
    #[arg(long, default_value = "10000")]
    max_records: u64,

    /// Locale for number and date conventions (e.g. de-DE, en-US)
    #[arg(short = 'l', long)]
    locale: Option<String>,

    /// Prefer day-month-year for ambiguous dates
    #[arg(long, conflicts_with = "mdy")]
    dmy: bool,

    /// Prefer month-day-year for ambiguous dates
    #[arg(long)]
    mdy: bool,

    /// Expected date pattern, e.g. "dd.MM.yyyy HH:mm"
    #[arg(long)]
    date_format: Option<String>,

    /// Leave identifier-like integer columns unconverted
    #[arg(long)]
    ignore_id_columns: bool,

    /// Output format: text (default), json, or csv
    #[arg(short = 'f', long, default_value = "text")]
    format: OutputFormat,

    /// Show the rendered diagnostics
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Maximum characters of rendered diagnostics
    #[arg(long, default_value = "4000")]
    max_diagnostic_chars: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error starting runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let inspector = match build_inspector(&args) {
        Ok(inspector) => inspector,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };

    let mut csv_out = csv::Writer::from_writer(io::stdout());
    let mut exit_code = ExitCode::SUCCESS;

    for (i, file) in args.files.iter().enumerate() {
        match runtime.block_on(inspect_file(&inspector, file, &cancel)) {
            Ok(inspection) => {
                let printed = match args.format {
                    OutputFormat::Text => {
                        print_text_output(file, &inspection, &args);
                        Ok(())
                    }
                    OutputFormat::Json => {
                        print_json_output(file, &inspection, &args);
                        Ok(())
                    }
                    OutputFormat::Csv => write_csv_output(&mut csv_out, file, &inspection, i == 0),
                };
                if let Err(e) = printed {
                    eprintln!("Error writing output: {e}");
                    exit_code = ExitCode::FAILURE;
                }
            }
            Err(e) if e.is_cancelled() => {
                eprintln!("Cancelled while processing {}", file.display());
                return ExitCode::from(130);
            }
            Err(e) => {
                eprintln!("Error processing {}: {}", file.display(), e);
                exit_code = ExitCode::FAILURE;
            }
        }
    }

    if let Err(e) = csv_out.flush() {
        eprintln!("Error writing output: {e}");
        exit_code = ExitCode::FAILURE;
    }
    exit_code
}

fn build_inspector(args: &Args) -> csv_sieve::Result<Inspector> {
    let encoding = match &args.encoding {
        Some(label) => {
            let encoding = TextEncoding::for_label(label).ok_or_else(|| {
                SieveError::InvalidConfig(format!("unknown encoding label {label:?}"))
            })?;
            if args.force_encoding {
                EncodingChoice::Override(encoding)
            } else {
                EncodingChoice::Hint(encoding)
            }
        }
        None => EncodingChoice::Auto,
    };

    let mut builder = DialectBuilder::new();
    builder
        .delimiter(parse_delimiter(&args.delimiter)?)
        .quote(parse_quote(&args.quote)?)
        .escape(args.escape)
        .has_header(!args.no_header)
        .skip_rows(args.skip_rows)
        .allow_row_combining(args.row_combining)
        .try_to_solve_more_columns(args.solve_more_columns)
        .encoding(encoding);
    if let Some(prefix) = &args.comment {
        builder.comment_prefix(prefix.as_str());
    }
    let dialect = builder.build()?;

    let mut inspector = Inspector::new();
    inspector
        .dialect(dialect)
        .sample_size(args.sample_size)
        .max_records(args.max_records)
        .detection(DetectionOptions {
            ignore_id_columns: args.ignore_id_columns,
            ..DetectionOptions::default()
        });

    inspector.hints(format_hints(args));
    if let Some(null) = &args.null {
        inspector.treat_as_null(null.as_str());
    }
    Ok(inspector)
}

/// Hints implied by --locale, --dmy, --mdy and --date-format.
fn format_hints(args: &Args) -> FormatHints {
    let mut hints = args
        .locale
        .as_deref()
        .map(FormatHints::for_locale)
        .unwrap_or_default();
    if args.dmy {
        hints.date_preference = Some(DatePreference::DmyFormat);
    } else if args.mdy {
        hints.date_preference = Some(DatePreference::MdyFormat);
    }
    if let Some(pattern) = &args.date_format {
        hints.date_format = Some(pattern.clone());
    }
    hints
}

async fn inspect_file(
    inspector: &Inspector,
    path: &Path,
    cancel: &CancellationToken,
) -> csv_sieve::Result<Inspection> {
    let file = File::open(path)?;
    inspector.inspect_async(file, cancel).await
}

/// Type, format details and status of a column guess.
fn describe(guess: Option<&GuessResult>) -> (String, String, &'static str) {
    let Some(guess) = guess else {
        return ("-".to_string(), String::new(), "no values");
    };
    let status = if guess.not_converted {
        "not converted"
    } else if guess.possible_match {
        "possible match"
    } else if guess.insufficient_evidence {
        "insufficient evidence"
    } else {
        "detected"
    };
    match guess.best_format() {
        Some(format) => {
            let full = format.to_string();
            let data_type = format.data_type.to_string();
            let details = full
                .strip_prefix(data_type.as_str())
                .unwrap_or_default()
                .trim()
                .to_string();
            (data_type, details, status)
        }
        None => ("String".to_string(), String::new(), status),
    }
}

fn print_text_output(path: &Path, inspection: &Inspection, args: &Args) {
    println!("File: {}", path.display());
    println!("  Encoding: {}", inspection.encoding);
    println!(
        "  Line ending: {}",
        inspection
            .line_ending
            .map_or("unknown", |ending| ending.escaped())
    );
    println!("  Delimiter: {:?}", inspection.dialect.delimiter);
    println!("  Quote: {}", inspection.dialect.quote);
    println!(
        "  Records sampled: {}{}",
        inspection.records_sampled,
        if inspection.reached_end { " (all)" } else { "" }
    );
    println!("  Columns: {}", inspection.columns.len());

    for column in &inspection.columns {
        let (data_type, details, status) = describe(column.guess.as_ref());
        print!("    {}: {} {}", column.index + 1, column.name, data_type);
        if !details.is_empty() {
            print!(" [{details}]");
        }
        if status != "detected" {
            print!(" ({status})");
        }
        if let Some(guess) = &column.guess {
            if guess.mismatches > 0 {
                print!(" {} mismatches", guess.mismatches);
            }
            if let Some(example) = &guess.example_non_match {
                print!(", e.g. {example:?}");
            }
        }
        println!();
    }

    let diagnostics = &inspection.diagnostics;
    println!(
        "  Diagnostics: {} ({} rows with warnings)",
        diagnostics.len(),
        diagnostics.warning_row_count()
    );
    if args.verbose && !diagnostics.is_empty() {
        for line in diagnostics.render(args.max_diagnostic_chars).lines() {
            println!("    {line}");
        }
    }
    println!();
}

fn print_json_output(path: &Path, inspection: &Inspection, args: &Args) {
    let line_ending = match inspection.line_ending {
        Some(ending) => format!("\"{}\"", ending.escaped()),
        None => "null".to_string(),
    };

    print!(
        r#"{{"file":"{}","encoding":"{}","line_ending":{},"delimiter":"{}","records_sampled":{},"reached_end":{},"columns":["#,
        json_escape(&path.display().to_string()),
        inspection.encoding,
        line_ending,
        json_escape(&inspection.dialect.delimiter.to_string()),
        inspection.records_sampled,
        inspection.reached_end,
    );

    for (i, column) in inspection.columns.iter().enumerate() {
        if i > 0 {
            print!(",");
        }
        let (data_type, details, status) = describe(column.guess.as_ref());
        let mismatches = column.guess.as_ref().map_or(0, |g| g.mismatches);
        print!(
            r#"{{"name":"{}","index":{},"type":"{}","format":"{}","status":"{}","mismatches":{},"distinct":{}}}"#,
            json_escape(&column.name),
            column.index,
            data_type,
            json_escape(&details),
            status,
            mismatches,
            column.distinct_values,
        );
    }
    print!(
        r#"],"warning_rows":{},"diagnostic_count":{}"#,
        inspection.diagnostics.warning_row_count(),
        inspection.diagnostics.len()
    );

    if args.verbose {
        print!(
            r#","diagnostics":"{}""#,
            json_escape(&inspection.diagnostics.render(args.max_diagnostic_chars))
        );
    }

    println!("}}");
}

fn write_csv_output<W: io::Write>(
    out: &mut csv::Writer<W>,
    path: &Path,
    inspection: &Inspection,
    first: bool,
) -> csv::Result<()> {
    if first {
        out.write_record([
            "file", "column", "index", "type", "format", "status", "mismatches", "distinct",
        ])?;
    }
    let file = path.display().to_string();
    for column in &inspection.columns {
        let (data_type, details, status) = describe(column.guess.as_ref());
        let mismatches = column.guess.as_ref().map_or(0, |g| g.mismatches);
        out.write_record([
            file.as_str(),
            column.name.as_str(),
            &(column.index + 1).to_string(),
            &data_type,
            &details,
            status,
            &mismatches.to_string(),
            &column.distinct_values.to_string(),
        ])?;
    }
    Ok(())
}

fn json_escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if (c as u32) < 0x20 => escaped.push_str(&format!("\\u{:04x}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}
