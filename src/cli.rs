// Command-line front end.
//
// `unpack` turns a container into JSON plus sidecar files, `pack` reverses
// it and `header` prints the prologue. Every command processes one file and
// finishes with a Success/Fail tally.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand, ValueHint};
use log::{error, info};

use crate::buffer::ByteBitBuffer;
use crate::container::ContainerHeader;
use crate::io::{pack_file, unpack_file};

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// XNB container unpacker/packer.
#[derive(Parser, Debug)]
#[command(
    name = "xnbkit",
    version,
    about = "Unpack XNB containers to JSON and pack them back",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Enable debug output.
    #[arg(long, global = true, conflicts_with_all = ["errors", "silent"])]
    debug: bool,

    /// Only print errors.
    #[arg(long, global = true, conflicts_with = "silent")]
    errors: bool,

    /// Print nothing but the summary.
    #[arg(long, global = true)]
    silent: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Unpack a container to JSON.
    Unpack(FileArgs),
    /// Pack a JSON document into a container.
    Pack(FileArgs),
    /// Print the container prologue.
    Header(HeaderArgs),
}

#[derive(Args, Debug)]
struct FileArgs {
    /// Input file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output file or directory (default: next to the input).
    #[arg(value_hint = ValueHint::AnyPath)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct HeaderArgs {
    /// Container file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Unpack,
    Pack,
    Header,
}

#[derive(Debug)]
struct Options {
    command: Command,
    force: bool,
    log_filter: &'static str,
    input_file: PathBuf,
    output_file: Option<PathBuf>,
}

fn resolve_options(cli: Cli) -> Options {
    let log_filter = if cli.silent {
        "off"
    } else if cli.errors {
        "error"
    } else if cli.debug {
        "debug"
    } else {
        "info"
    };

    let (command, input_file, output_file) = match cli.command {
        Cmd::Unpack(args) => (Command::Unpack, args.input, args.output),
        Cmd::Pack(args) => (Command::Pack, args.input, args.output),
        Cmd::Header(args) => (Command::Header, args.input, None),
    };

    Options {
        command,
        force: cli.force,
        log_filter,
        input_file,
        output_file,
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("xnbkit".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let opts = resolve_options(cli);
        let _ = output_path(&opts.input_file, opts.output_file.as_deref(), "json");
    }
}

/// Output path for `input`: swap its extension for `extension`, placed in
/// `output` when that is a directory.
fn output_path(input: &Path, output: Option<&Path>, extension: &str) -> PathBuf {
    let renamed = input.with_extension(extension);
    match output {
        None => renamed,
        Some(dir) if dir.is_dir() => match renamed.file_name() {
            Some(name) => dir.join(name),
            None => dir.to_path_buf(),
        },
        Some(path) => path.to_path_buf(),
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

// ---------------------------------------------------------------------------
// Tally
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Tally {
    success: usize,
    fail: usize,
}

impl Tally {
    fn record(&mut self, input: &Path, outcome: Result<(), String>) {
        match outcome {
            Ok(()) => self.success += 1,
            Err(e) => {
                error!("{}: {e}", input.display());
                self.fail += 1;
            }
        }
    }

    fn finish(&self) -> i32 {
        println!("Success {}", self.success);
        println!("Fail {}", self.fail);
        i32::from(self.fail > 0)
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn check_output(output: &Path, force: bool) -> Result<(), String> {
    if output.exists() && !force {
        return Err(format!(
            "output file exists, use -f to overwrite: {}",
            output.display()
        ));
    }
    Ok(())
}

fn cmd_unpack(opts: &Options) -> Result<(), String> {
    let input = &opts.input_file;
    if !has_extension(input, "xnb") {
        return Err("not a .xnb file".into());
    }
    let output = output_path(input, opts.output_file.as_deref(), "json");
    check_output(&output, opts.force)?;

    let stats = unpack_file(input, &output).map_err(|e| e.to_string())?;
    info!(
        "unpacked {} bytes, {} reader(s), {} exported file(s)",
        stats.input_size,
        stats.readers,
        stats.exported.len()
    );
    Ok(())
}

fn cmd_pack(opts: &Options) -> Result<(), String> {
    let input = &opts.input_file;
    if !has_extension(input, "json") {
        return Err("not a .json file".into());
    }
    let output = output_path(input, opts.output_file.as_deref(), "xnb");
    check_output(&output, opts.force)?;

    let stats = pack_file(input, &output).map_err(|e| e.to_string())?;
    info!(
        "packed {} bytes from {} imported file(s)",
        stats.output_size, stats.imported
    );
    Ok(())
}

fn cmd_header(opts: &Options) -> Result<(), String> {
    let data = std::fs::read(&opts.input_file).map_err(|e| e.to_string())?;
    let mut buf = ByteBitBuffer::new(data);
    let header = ContainerHeader::decode(&mut buf).map_err(|e| e.to_string())?;

    println!("File: {}", opts.input_file.display());
    println!(
        "Platform: {} ({})",
        char::from(header.platform.code()),
        header.platform.name()
    );
    println!("Format version: {}", header.format_version);
    println!("Profile: {}", if header.hidef() { "HiDef" } else { "Reach" });
    println!("Compression: {:?}", header.compression());
    println!("File size: {}", header.file_size);
    if let Some(size) = header.decompressed_size {
        println!("Decompressed size: {size}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(opts.log_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let mut tally = Tally::default();
    let outcome = match opts.command {
        Command::Unpack => cmd_unpack(&opts),
        Command::Pack => cmd_pack(&opts),
        Command::Header => cmd_header(&opts),
    };
    tally.record(&opts.input_file, outcome);

    process::exit(tally.finish());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
