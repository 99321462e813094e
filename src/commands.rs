//! Command implementations for keydiff CLI

use crate::cli::{Commands, OutputFormat, PairArgs};
use crate::config::{parse_key_list, parse_renames, Settings, SortStrategy, SourceSpec};
use crate::diff::{diff_events, snapshot};
use crate::error::Result;
use crate::event::{EventSink, Redacted};
use crate::output::{JsonFormatter, JsonLinesSink, OutputStream, PrettyPrinter};
use crate::progress::{ProgressReporter, ProgressSink};
use crate::source::open_table;
use crate::summary::SummaryBuilder;
use crate::table::Renames;
use std::io::Write;
use std::path::Path;

/// Execute a command
pub fn execute_command(command: Commands, config: Option<&Path>, quiet: bool) -> Result<()> {
    let settings = Settings::load(config)?;

    match command {
        Commands::Diff {
            pair,
            detail,
            format,
            output,
        } => diff_command(&settings, &pair, detail, format, output.as_deref(), quiet),
        Commands::Events {
            pair,
            redact,
            output,
        } => events_command(&settings, &pair, redact, output.as_deref(), quiet),
        Commands::Snapshot {
            input,
            key,
            sort,
            strategy,
            rename,
            delimiter,
            db,
            output,
        } => {
            let spec = source_spec(&input, parse_key_list(&key), db.as_deref())?
                .with_renames(renames_arg(rename.as_deref())?)
                .with_sort(sort_strategy(sort, strategy, &settings))
                .with_delimiter(delimiter);
            snapshot_command(&settings, &spec, output.as_deref(), quiet)
        }
    }
}

fn renames_arg(spec: Option<&str>) -> Result<Renames> {
    match spec {
        Some(spec) => parse_renames(spec),
        None => Ok(Renames::new()),
    }
}

/// Strategy for a side: none unless flagged as unsorted.
fn sort_strategy(unsorted: bool, requested: Option<SortStrategy>, settings: &Settings) -> SortStrategy {
    if !unsorted {
        return SortStrategy::None;
    }
    match requested.unwrap_or(settings.sort_strategy) {
        SortStrategy::None => SortStrategy::Memory,
        strategy => strategy,
    }
}

/// A file source, or a table when a database is given.
fn source_spec(input: &Path, key: Vec<String>, database: Option<&str>) -> Result<SourceSpec> {
    match database {
        Some(db) => Ok(SourceSpec::database_table(
            &input.to_string_lossy(),
            Some(db.to_string()),
            key,
        )),
        None => SourceSpec::new(input, key),
    }
}

fn pair_specs(pair: &PairArgs, settings: &Settings) -> Result<(SourceSpec, SourceSpec)> {
    let left_key = parse_key_list(&pair.key);
    let right_key = match &pair.right_key {
        Some(keys) => parse_key_list(keys),
        None => left_key.clone(),
    };

    let left = source_spec(&pair.left, left_key, pair.db.as_deref())?
        .with_renames(renames_arg(pair.rename_left.as_deref())?)
        .with_sort(sort_strategy(pair.sort_left, pair.strategy, settings))
        .with_delimiter(pair.delimiter);
    let right = source_spec(&pair.right, right_key, pair.db.as_deref())?
        .with_renames(renames_arg(pair.rename_right.as_deref())?)
        .with_sort(sort_strategy(pair.sort_right, pair.strategy, settings))
        .with_delimiter(pair.delimiter);

    Ok((left, right))
}

/// Open both sides and run the merge-join into `sink`.
fn run_pair<S: EventSink + ?Sized>(
    settings: &Settings,
    pair: &PairArgs,
    sink: &mut S,
    progress: &ProgressReporter,
) -> Result<()> {
    let (left_spec, right_spec) = pair_specs(pair, settings)?;

    progress.set_message(&format!("Opening {}...", left_spec.path.display()));
    let mut left = open_table(&left_spec, settings)?;
    progress.set_message(&format!("Opening {}...", right_spec.path.display()));
    let mut right = open_table(&right_spec, settings)?;

    progress.set_message("Comparing rows...");
    diff_events(&mut left, &mut right, &mut ProgressSink::new(sink, progress))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Summarize the differences between two sources
fn diff_command(
    settings: &Settings,
    pair: &PairArgs,
    detail: bool,
    format: OutputFormat,
    output: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let mut progress = ProgressReporter::enabled(!quiet, "Preparing diff...");

    let mut builder = SummaryBuilder::new(detail);
    run_pair(settings, pair, &mut builder, &progress)?;
    let summary = builder.finish();
    progress.finish("Diff complete");

    let rendered = match format {
        OutputFormat::Json => JsonFormatter::format(&summary)?,
        OutputFormat::Pretty => PrettyPrinter::render_table_diff(
            &summary,
            &display_name(&pair.left),
            &display_name(&pair.right),
        ),
    };

    match output {
        None => println!("{}", rendered),
        Some(path) => {
            let mut stream = OutputStream::open(Some(path))?;
            writeln!(stream, "{}", rendered)?;
            stream.finish()?;
            println!("💾 Diff saved to: {}", path.display());
        }
    }

    Ok(())
}

/// Stream every finding as JSON lines
fn events_command(
    settings: &Settings,
    pair: &PairArgs,
    redact: bool,
    output: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let stream = OutputStream::open(output)?;
    let mut progress = ProgressReporter::enabled(!quiet && !stream.is_stdout(), "Preparing diff...");

    let mut lines = JsonLinesSink::new(stream);
    let lines = if redact {
        let mut sink = Redacted::new(lines);
        run_pair(settings, pair, &mut sink, &progress)?;
        sink.into_inner()
    } else {
        run_pair(settings, pair, &mut lines, &progress)?;
        lines
    };

    let written = lines.written();
    lines.into_inner().finish()?;
    progress.finish("Diff complete");

    report_written(written, output);
    Ok(())
}

/// Emit every row of one source as row-stored events
fn snapshot_command(
    settings: &Settings,
    spec: &SourceSpec,
    output: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let stream = OutputStream::open(output)?;
    let mut progress = ProgressReporter::enabled(
        !quiet && !stream.is_stdout(),
        &format!("Opening {}...", spec.path.display()),
    );

    let mut table = open_table(spec, settings)?;
    progress.set_message("Storing rows...");

    let mut lines = JsonLinesSink::new(stream);
    snapshot(&mut table, &mut ProgressSink::new(&mut lines, &progress))?;

    let written = lines.written();
    lines.into_inner().finish()?;
    progress.finish("Snapshot complete");

    report_written(written, output);
    Ok(())
}

fn report_written(written: u64, output: Option<&Path>) {
    match output {
        Some(path) => println!("💾 {} events written to {}", written, path.display()),
        None => log::info!("{} events written", written),
    }
}
