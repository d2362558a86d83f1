//! bfaot command line driver.
//!
//! Reads brainfuck source from a file or standard input and writes an
//! executable. When standard output is a terminal the image goes to a file
//! (`a.out` unless `-o` says otherwise) and is marked executable; when it
//! is redirected the image is written to standard output instead.

use std::error::Error;
use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bfaot::compiler::{build_ir, compile_with_stats, lower, CompileOptions, DEFAULT_CELL_COUNT};
use bfaot::ir::printer;
use bfaot::x64::disasm;
use bfaot::{CompileError, EofBehavior};
use clap::{ArgAction, Parser, ValueEnum};

const DEFAULT_OUTPUT: &str = "a.out";

#[derive(Parser, Debug)]
#[command(name = "bfaot", version, about = "Compile brainfuck to a static x86-64 Linux executable")]
struct Cli {
    /// Source file; standard input when omitted or "-"
    input: Option<PathBuf>,

    /// Executable path, used when standard output is a terminal
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// What to produce
    #[arg(long, value_enum, default_value_t = Emit::Exe)]
    emit: Emit,

    /// Number of tape cells
    #[arg(long, default_value_t = DEFAULT_CELL_COUNT, value_parser = clap::value_parser!(u64).range(1..))]
    cells: u64,

    /// Value of a cell after `,` hits end of input
    #[arg(long, value_enum, default_value_t = Eof::Unchanged)]
    eof: Eof,

    /// Skip the peephole pass
    #[arg(long)]
    no_opt: bool,

    /// Print compilation statistics to stderr
    #[arg(long)]
    stats: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// ELF executable
    Exe,
    /// Optimized op listing
    Ir,
    /// Annotated x86-64 disassembly
    Asm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Eof {
    Unchanged,
    Zero,
}

impl From<Eof> for EofBehavior {
    fn from(eof: Eof) -> Self {
        match eof {
            Eof::Unchanged => EofBehavior::Unchanged,
            Eof::Zero => EofBehavior::Zero,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", describe_error(e.as_ref()));
            ExitCode::FAILURE
        }
    }
}

/// One-line report for a failed run. Problems in the source text are
/// labelled as such so they are not mistaken for compiler faults.
fn describe_error(error: &(dyn Error + 'static)) -> String {
    match error.downcast_ref::<CompileError>() {
        Some(e) if e.is_syntax_error() => format!("syntax error in input: {}", e),
        _ => format!("error: {}", error),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let source = read_source(cli.input.as_deref())?;
    let options = CompileOptions {
        cell_count: cli.cells,
        optimize: !cli.no_opt,
        eof: cli.eof.into(),
    };

    let stats = match cli.emit {
        Emit::Ir => {
            let mut stats = options.new_stats();
            let program = build_ir(&source, &options, &mut stats)?;
            print_text(&printer::print(&program))?;
            stats
        }
        Emit::Asm => {
            let mut stats = options.new_stats();
            let (program, emitted) = lower(&source, &options, &mut stats)?;
            print_text(&disasm::annotated_listing(&program, &emitted, 0))?;
            stats
        }
        Emit::Exe => {
            let compilation = compile_with_stats(&source, &options)?;
            write_image(&compilation.image, cli.output.as_deref())?;
            compilation.stats
        }
    };

    if cli.stats {
        eprint!("{}", stats);
    }
    Ok(())
}

fn read_source(input: Option<&Path>) -> io::Result<Vec<u8>> {
    match input {
        Some(path) if path != Path::new("-") => fs::read(path),
        _ => {
            let mut source = Vec::new();
            io::stdin().lock().read_to_end(&mut source)?;
            Ok(source)
        }
    }
}

fn print_text(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()
}

fn write_image(image: &[u8], output: Option<&Path>) -> io::Result<()> {
    let stdout = io::stdout();

    if stdout.is_terminal() {
        let path = output.unwrap_or(Path::new(DEFAULT_OUTPUT));
        fs::write(path, image)?;
        make_executable(path)?;
        log::info!("wrote {} bytes to {}", image.len(), path.display());
        return Ok(());
    }

    if let Some(path) = output {
        eprintln!("ignoring output file {} and writing to stdout", path.display());
    }
    let mut stdout = stdout.lock();
    stdout.write_all(image)?;
    stdout.flush()
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["bfaot"]).unwrap();
        assert_eq!(cli.input, None);
        assert_eq!(cli.output, None);
        assert_eq!(cli.emit, Emit::Exe);
        assert_eq!(cli.cells, DEFAULT_CELL_COUNT);
        assert_eq!(cli.eof, Eof::Unchanged);
        assert!(!cli.no_opt);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "bfaot", "prog.b", "-o", "prog", "--emit", "asm", "--cells", "300", "--eof", "zero",
            "--no-opt", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.input, Some(PathBuf::from("prog.b")));
        assert_eq!(cli.output, Some(PathBuf::from("prog")));
        assert_eq!(cli.emit, Emit::Asm);
        assert_eq!(cli.cells, 300);
        assert_eq!(EofBehavior::from(cli.eof), EofBehavior::Zero);
        assert!(cli.no_opt);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_rejects_zero_cells() {
        assert!(Cli::try_parse_from(["bfaot", "--cells", "0"]).is_err());
    }

    #[test]
    fn test_syntax_errors_are_labelled() {
        let err: Box<dyn Error> = Box::new(CompileError::UnmatchedCloseBracket { offset: 4 });
        assert_eq!(
            describe_error(err.as_ref()),
            "syntax error in input: unmatched ']' at byte 4: no loop to close"
        );

        let err: Box<dyn Error> = Box::new(CompileError::ResourceExhausted { what: "code buffer" });
        assert_eq!(describe_error(err.as_ref()), "error: resource exhausted: code buffer");

        let err: Box<dyn Error> = Box::new(io::Error::new(io::ErrorKind::NotFound, "missing.b"));
        assert_eq!(describe_error(err.as_ref()), "error: missing.b");
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
