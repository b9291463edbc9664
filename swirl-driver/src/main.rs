//! SWIRL front end driver
//!
//! Translates low-level dumps into a merged program in the simplified
//! dialect (or JSON), checks the round-trip law on `.swirl` files, and
//! prints single translated modules.

use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, LevelFilter};
use std::fs;
use std::path::{Path, PathBuf};
use swirl_common::{ErrorReporter, SwirlError, SwirlResult};
use swirl_frontend::{Frontend, PipelineOptions, SourceUnit};
use swirl_ir::{parse_module, verify_module, Linkage, Printer, PrinterOptions};

#[derive(Parser)]
#[command(name = "swirl")]
#[command(about = "Translate SIL dumps into the SWIRL analysis IR")]
#[command(version = "0.1.0")]
struct Cli {
    /// Enable debug logging (RUST_LOG still applies otherwise)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate and merge source files into one program
    Translate {
        /// Input files (.sil, or .swirl for the simplified dialect)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Emit::Swirl)]
        emit: Emit,

        /// Name of the merged program
        #[arg(long, default_value = "program")]
        name: String,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Check that print(parse(text)) reproduces each .swirl file exactly
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Files carry `; #N` line-number comments
        #[arg(long)]
        line_comments: bool,

        /// Files carry `loc "file":l:c` source positions
        #[arg(long)]
        positions: bool,
    },

    /// Translate one file and print its module
    Print {
        file: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    Swirl,
    Json,
}

/// Flags that override the pipeline configuration
#[derive(clap::Args, Debug, Default)]
struct PipelineArgs {
    /// Keep dead pure instructions
    #[arg(long)]
    no_prune: bool,

    /// Do not number instructions
    #[arg(long)]
    no_line_numbers: bool,

    /// Translate files one at a time
    #[arg(long)]
    sequential: bool,

    /// Print `; #N` line-number comments
    #[arg(long)]
    line_comments: bool,

    /// Print `loc "file":l:c` source positions
    #[arg(long)]
    positions: bool,

    /// JSON pipeline configuration; flags take precedence
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl PipelineArgs {
    fn options(&self) -> SwirlResult<PipelineOptions> {
        let mut options = match &self.config {
            Some(path) => load_config(path)?,
            None => PipelineOptions::default(),
        };
        if self.no_prune {
            options.prune = false;
        }
        if self.no_line_numbers {
            options.line_numbers = false;
        }
        if self.sequential {
            options.parallel = false;
        }
        if self.line_comments {
            options.printer.line_numbers = true;
        }
        if self.positions {
            options.printer.source_positions = true;
        }
        Ok(options)
    }
}

fn load_config(path: &Path) -> SwirlResult<PipelineOptions> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| SwirlError::Io {
        message: format!("invalid configuration {}: {}", path.display(), e),
    })
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Translate {
            files,
            output,
            emit,
            name,
            pipeline,
        } => run_translate(&files, output.as_deref(), emit, &name, &pipeline),
        Commands::Check {
            files,
            line_comments,
            positions,
        } => run_check(
            &files,
            PrinterOptions {
                line_numbers: line_comments,
                source_positions: positions,
            },
        ),
        Commands::Print { file, pipeline } => run_print(&file, &pipeline),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn read_units(files: &[PathBuf]) -> SwirlResult<Vec<SourceUnit>> {
    files
        .iter()
        .map(|path| {
            let text = fs::read_to_string(path).map_err(|e| SwirlError::Io {
                message: format!("{}: {}", path.display(), e),
            })?;
            Ok(SourceUnit::from_file(path, text))
        })
        .collect()
}

/// Translate and merge; returns the rendered program and the diagnostics
fn translate_files(
    files: &[PathBuf],
    name: &str,
    emit: Emit,
    options: &PipelineOptions,
) -> SwirlResult<(String, ErrorReporter)> {
    let units = read_units(files)?;
    let report = Frontend::build_program(name, &units, options);

    let mut reporter = ErrorReporter::new();
    for failure in &report.failures {
        reporter.module_failure(failure);
    }
    let stubs = report
        .group
        .functions()
        .filter(|function| function.linkage == Linkage::Model)
        .count();
    if stubs > 0 {
        reporter.warning(format!("{} function(s) have no body and stay model stubs", stubs), None);
    }

    let rendered = match emit {
        Emit::Swirl => Printer::new(options.printer).print_group(&report.group),
        Emit::Json => {
            let mut json = serde_json::to_string_pretty(&report.group).map_err(|e| SwirlError::Io {
                message: format!("cannot serialize program: {}", e),
            })?;
            json.push('\n');
            json
        }
    };
    Ok((rendered, reporter))
}

fn run_translate(
    files: &[PathBuf],
    output: Option<&Path>,
    emit: Emit,
    name: &str,
    pipeline: &PipelineArgs,
) -> SwirlResult<bool> {
    let options = pipeline.options()?;
    debug!("Pipeline options: {:?}", options);
    let (rendered, reporter) = translate_files(files, name, emit, &options)?;

    match output {
        Some(path) => fs::write(path, &rendered)?,
        None => print!("{}", rendered),
    }
    for diagnostic in reporter.diagnostics() {
        eprintln!("{}", diagnostic);
    }
    if reporter.has_errors() {
        eprintln!("{}", reporter.summary());
    }
    Ok(!reporter.has_errors())
}

/// Files whose text is not reproduced by parse-then-print, with the reason.
/// `printer` must match the options the files were written with.
fn check_files(files: &[PathBuf], printer: PrinterOptions) -> SwirlResult<ErrorReporter> {
    let printer = Printer::new(printer);
    let mut reporter = ErrorReporter::new();
    for path in files {
        let text = fs::read_to_string(path)?;
        let filename = path.display().to_string();
        let parsed = parse_module(&text, &filename).and_then(|module| {
            verify_module(&module)?;
            Ok(module)
        });
        match parsed {
            Ok(module) => {
                let printed = printer.print_module(&module);
                if printed != text {
                    let line = printed
                        .lines()
                        .zip(text.lines())
                        .position(|(a, b)| a != b)
                        .unwrap_or_else(|| printed.lines().count().min(text.lines().count()));
                    reporter.error(
                        format!("{} does not round-trip; first difference on line {}", filename, line + 1),
                        None,
                    );
                }
            }
            Err(error) => {
                let location = error.location().cloned();
                reporter.error(error.to_string(), location);
            }
        }
    }
    Ok(reporter)
}

fn run_check(files: &[PathBuf], printer: PrinterOptions) -> SwirlResult<bool> {
    let reporter = check_files(files, printer)?;
    for diagnostic in reporter.diagnostics() {
        eprintln!("{}", diagnostic);
    }
    if reporter.has_errors() {
        eprintln!("{}", reporter.summary());
    } else {
        eprintln!("{} file(s) round-trip", files.len());
    }
    Ok(!reporter.has_errors())
}

fn run_print(file: &Path, pipeline: &PipelineArgs) -> SwirlResult<bool> {
    let options = pipeline.options()?;
    let text = fs::read_to_string(file)?;
    let unit = SourceUnit::from_file(file, text);
    let module = Frontend::translate_unit(&unit, &options).map_err(|failure| failure.error)?;
    print!("{}", Printer::new(options.printer).print_module(&module));
    Ok(true)
}
