// Command-line front end for xzstream.
//
// `compress` and `decompress` stream between files or stdin/stdout through
// the `io` helpers; `config` prints build details.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::config::{
    self, DEFAULT_LEVEL, DEFAULT_READER_BUFFER, DEFAULT_WRITER_BUFFER, DecoderConfig,
    DecoderFlags, EncoderConfig, Preset,
};
use crate::engine::{Check, Liblzma};
use crate::io::{self as xio, OutputMode};

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Byte size parsing (supports K, M, G suffixes)
// ---------------------------------------------------------------------------

fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size string".into());
    }
    let (num_part, multiplier) = match s.as_bytes().last() {
        Some(b'k' | b'K') => (&s[..s.len() - 1], 1024u64),
        Some(b'm' | b'M') => (&s[..s.len() - 1], 1024 * 1024),
        Some(b'g' | b'G') => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        _ => (s, 1u64),
    };
    let num: u64 = num_part
        .trim()
        .parse()
        .map_err(|e| format!("invalid size '{s}': {e}"))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflow: '{s}'"))
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Streaming .xz compressor/decompressor.
#[derive(Parser, Debug)]
#[command(
    name = "xzstream",
    version,
    about = "Streaming .xz compressor/decompressor",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compress an input stream to .xz.
    Compress(CompressArgs),
    /// Decompress .xz or .lzma input (concatenated streams included).
    Decompress(DecompressArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CheckArg {
    None,
    Crc32,
    Crc64,
    Sha256,
}

impl From<CheckArg> for Check {
    fn from(arg: CheckArg) -> Self {
        match arg {
            CheckArg::None => Check::None,
            CheckArg::Crc32 => Check::Crc32,
            CheckArg::Crc64 => Check::Crc64,
            CheckArg::Sha256 => Check::Sha256,
        }
    }
}

#[derive(Args, Debug)]
struct CompressArgs {
    /// Worker threads; 0 uses every available core.
    #[arg(short = 'T', long, default_value_t = 1)]
    threads: u32,

    /// Compression level (0-9).
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u32).range(0..=9), default_value_t = DEFAULT_LEVEL)]
    level: u32,

    /// Use the slower extreme variant of the level.
    #[arg(short = 'e', long)]
    extreme: bool,

    /// Integrity check stored in the stream.
    #[arg(long, value_enum, default_value_t = CheckArg::Crc64)]
    check: CheckArg,

    /// Multi-threaded block size (supports K/M/G suffix; 0 = automatic).
    #[arg(long = "block-size", value_parser = parse_byte_size, default_value_t = 0)]
    block_size: u64,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Input file (default: stdin).
    #[arg(value_hint = ValueHint::FilePath)]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DecompressArgs {
    /// Decoder memory limit (supports K/M/G suffix).
    #[arg(long, value_parser = parse_byte_size)]
    memlimit: Option<u64>,

    /// Do not verify the integrity check.
    #[arg(long = "ignore-check")]
    ignore_check: bool,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Input file (default: stdin).
    #[arg(value_hint = ValueHint::FilePath)]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Compress,
    Decompress,
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    use_stdout: bool,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    threads: u32,
    level: u32,
    extreme: bool,
    check: Check,
    block_size: u64,
    memlimit: u64,
    ignore_check: bool,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
}

impl Options {
    fn base(command: Command, cli: &Cli) -> Self {
        Self {
            command,
            use_stdout: false,
            force: cli.force,
            quiet: cli.quiet,
            verbose: cli.verbose.min(3),
            json_output: cli.json_output,
            threads: 1,
            level: DEFAULT_LEVEL,
            extreme: false,
            check: Check::Crc64,
            block_size: 0,
            memlimit: u64::MAX,
            ignore_check: false,
            input_file: None,
            output_file: None,
        }
    }
}

fn resolve_options(cli: Cli) -> Options {
    match &cli.command {
        Cmd::Compress(args) => Options {
            use_stdout: args.stdout,
            threads: args.threads,
            level: args.level,
            extreme: args.extreme,
            check: args.check.into(),
            block_size: args.block_size,
            input_file: args.input.clone(),
            output_file: args.output.clone(),
            ..Options::base(Command::Compress, &cli)
        },
        Cmd::Decompress(args) => Options {
            use_stdout: args.stdout,
            memlimit: args.memlimit.unwrap_or(u64::MAX),
            ignore_check: args.ignore_check,
            input_file: args.input.clone(),
            output_file: args.output.clone(),
            ..Options::base(Command::Decompress, &cli)
        },
        Cmd::Config => Options::base(Command::Config, &cli),
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("xzstream".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let opts = resolve_options(cli);
        let _ = build_encoder_config(&opts);
        let _ = build_decoder_config(&opts);
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("xzstream version {version} (Rust)");
    eprintln!("liblzma version {}", Liblzma::version());

    let file_io = cfg!(feature = "file-io") as u8;
    let static_lzma = cfg!(feature = "static") as u8;
    let ptr_size = std::mem::size_of::<*const ()>();

    eprintln!("FILE_IO={file_io}");
    eprintln!("STATIC_LIBLZMA={static_lzma}");
    eprintln!("DEFAULT_LEVEL={DEFAULT_LEVEL}");
    eprintln!("DEFAULT_WRITER_BUFFER={DEFAULT_WRITER_BUFFER}");
    eprintln!("DEFAULT_READER_BUFFER={DEFAULT_READER_BUFFER}");
    eprintln!("AVAILABLE_THREADS={}", config::available_threads());
    eprintln!("sizeof(usize)={ptr_size}");

    0
}

// ---------------------------------------------------------------------------
// Build configs from CLI options
// ---------------------------------------------------------------------------

fn build_encoder_config(opts: &Options) -> crate::Result<EncoderConfig> {
    let threads = match opts.threads {
        0 => config::available_threads(),
        n => n,
    };
    let mut preset = Preset::new(opts.level)?;
    if opts.extreme {
        preset = preset.extreme();
    }
    Ok(EncoderConfig {
        threads,
        preset,
        check: opts.check,
        block_size: opts.block_size,
        ..EncoderConfig::default()
    })
}

fn build_decoder_config(opts: &Options) -> crate::Result<DecoderConfig> {
    let mut flags = DecoderFlags::CONCATENATED;
    if opts.ignore_check {
        flags |= DecoderFlags::IGNORE_CHECK;
    }
    if opts.memlimit == 0 {
        return Err(crate::Error::invalid("--memlimit must be non-zero"));
    }
    Ok(DecoderConfig {
        memlimit: opts.memlimit,
        flags,
        ..DecoderConfig::default()
    })
}

// ---------------------------------------------------------------------------
// Input / output plumbing
// ---------------------------------------------------------------------------

fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>, i32> {
    match path {
        Some(path) => match File::open(path) {
            Ok(f) => Ok(Box::new(BufReader::with_capacity(BUF_SIZE, f))),
            Err(e) => {
                eprintln!("xzstream: input file: {}: {e}", path.display());
                Err(1)
            }
        },
        None => Ok(Box::new(io::stdin().lock())),
    }
}

fn open_output(opts: &Options) -> Result<Box<dyn Write>, i32> {
    match (opts.use_stdout, &opts.output_file) {
        (true, _) | (_, None) => Ok(Box::new(io::stdout().lock())),
        (false, Some(path)) => {
            let mode = if opts.force {
                OutputMode::Create
            } else {
                OutputMode::CreateNew
            };
            match mode.open(path) {
                Ok(f) => Ok(Box::new(f)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    eprintln!(
                        "xzstream: output file exists, use -f to overwrite: {}",
                        path.display()
                    );
                    Err(1)
                }
                Err(e) => {
                    eprintln!("xzstream: output file: {}: {e}", path.display());
                    Err(1)
                }
            }
        }
    }
}

fn hex(digest: &[u8; 32]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn ratio(compressed: u64, plain: u64) -> f64 {
    if plain == 0 {
        0.0
    } else {
        compressed as f64 / plain as f64
    }
}

// ---------------------------------------------------------------------------
// Compress command
// ---------------------------------------------------------------------------

fn cmd_compress(opts: &Options) -> i32 {
    let config = match build_encoder_config(opts) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("xzstream: {e}");
            return 1;
        }
    };
    let input = match open_input(opts.input_file.as_deref()) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let output = match open_output(opts) {
        Ok(w) => w,
        Err(code) => return code,
    };

    let stats = match xio::compress_stream(input, output, &config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("xzstream: compress error: {e}");
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "xzstream: compressed {} -> {} bytes (ratio {:.3}), level {}{}, {} thread(s)",
            stats.input_size,
            stats.output_size,
            ratio(stats.output_size, stats.input_size),
            opts.level,
            if opts.extreme { "e" } else { "" },
            config.threads
        );
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "compress",
            "input_size": stats.input_size,
            "output_size": stats.output_size,
            "level": opts.level,
            "extreme": opts.extreme,
            "threads": config.threads,
            "input_sha256": stats.input_sha256.as_ref().map(hex),
        });
        eprintln!("{json:#}");
    }

    0
}

// ---------------------------------------------------------------------------
// Decompress command
// ---------------------------------------------------------------------------

fn cmd_decompress(opts: &Options) -> i32 {
    let config = match build_decoder_config(opts) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("xzstream: {e}");
            return 1;
        }
    };
    let input = match open_input(opts.input_file.as_deref()) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let output = match open_output(opts) {
        Ok(w) => w,
        Err(code) => return code,
    };

    let stats = match xio::decompress_stream(input, output, &config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("xzstream: decompress error: {e}");
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "xzstream: decompressed {} -> {} bytes",
            stats.input_size, stats.output_size
        );
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "decompress",
            "input_size": stats.input_size,
            "output_size": stats.output_size,
            "output_sha256": stats.output_sha256.as_ref().map(hex),
        });
        eprintln!("{json:#}");
    }

    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn log_filter(opts: &Options) -> &'static str {
    if opts.quiet {
        return "error";
    }
    match opts.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub fn run() -> ! {
    let cli = Cli::parse();
    let mut opts = resolve_options(cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(&opts)))
        .format_timestamp(None)
        .format_target(false)
        .init();

    // Warn if -c overrides output filename.
    if opts.use_stdout
        && let Some(path) = opts.output_file.take()
        && !opts.quiet
    {
        eprintln!(
            "xzstream: warning: -c option overrides output filename: {}",
            path.display()
        );
    }

    let exit_code = match opts.command {
        Command::Compress => cmd_compress(&opts),
        Command::Decompress => cmd_decompress(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_opts(args: &[&str]) -> Options {
        let argv: Vec<String> = std::iter::once("xzstream".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        let cli = Cli::try_parse_from(argv).expect("cli parse failed");
        resolve_options(cli)
    }

    #[test]
    fn parse_byte_size_suffixes() {
        assert_eq!(parse_byte_size("1").unwrap(), 1);
        assert_eq!(parse_byte_size("2K").unwrap(), 2 * 1024);
        assert_eq!(parse_byte_size("3m").unwrap(), 3 * 1024 * 1024);
        assert_eq!(parse_byte_size("4G").unwrap(), 4 * 1024 * 1024 * 1024);
        assert!(parse_byte_size("").is_err());
        assert!(parse_byte_size("lots").is_err());
    }

    #[test]
    fn compress_subcommand_maps_correctly() {
        let opts = parse_opts(&[
            "compress",
            "-T",
            "4",
            "--level",
            "9",
            "-e",
            "--check",
            "sha256",
            "--block-size",
            "8M",
            "in.bin",
            "out.xz",
        ]);
        assert_eq!(opts.command, Command::Compress);
        assert_eq!(opts.threads, 4);
        assert_eq!(opts.level, 9);
        assert!(opts.extreme);
        assert_eq!(opts.check, Check::Sha256);
        assert_eq!(opts.block_size, 8 * 1024 * 1024);
        assert_eq!(opts.input_file, Some(PathBuf::from("in.bin")));
        assert_eq!(opts.output_file, Some(PathBuf::from("out.xz")));

        let config = build_encoder_config(&opts).unwrap();
        assert_eq!(config.threads, 4);
        assert!(config.preset.is_extreme());
        assert_eq!(config.preset.level(), 9);
    }

    #[test]
    fn decompress_subcommand_maps_correctly() {
        let opts = parse_opts(&[
            "--quiet",
            "decompress",
            "--memlimit",
            "64M",
            "--ignore-check",
            "in.xz",
            "out.bin",
        ]);
        assert_eq!(opts.command, Command::Decompress);
        assert!(opts.quiet);
        assert_eq!(opts.memlimit, 64 * 1024 * 1024);
        assert!(opts.ignore_check);

        let config = build_decoder_config(&opts).unwrap();
        assert!(config.flags.contains(DecoderFlags::CONCATENATED));
        assert!(config.flags.contains(DecoderFlags::IGNORE_CHECK));
    }

    #[test]
    fn defaults_match_library_defaults() {
        let opts = parse_opts(&["compress"]);
        assert_eq!(opts.threads, 1);
        assert_eq!(opts.level, DEFAULT_LEVEL);
        assert_eq!(opts.check, Check::Crc64);
        assert!(opts.input_file.is_none());
        assert_eq!(build_encoder_config(&opts).unwrap(), EncoderConfig::default());

        let opts = parse_opts(&["decompress"]);
        assert_eq!(build_decoder_config(&opts).unwrap(), DecoderConfig::default());
    }

    #[test]
    fn zero_threads_means_all_cores() {
        let opts = parse_opts(&["compress", "-T", "0"]);
        let config = build_encoder_config(&opts).unwrap();
        assert_eq!(config.threads, config::available_threads());
    }

    #[test]
    fn global_stdio_and_force_flags() {
        let opts = parse_opts(&["--force", "compress", "--stdout", "in", "out"]);
        assert!(opts.use_stdout);
        assert!(opts.force);
    }

    #[test]
    fn invalid_level_rejected_by_parser() {
        let argv = ["xzstream", "compress", "--level", "10"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn zero_memlimit_rejected() {
        let opts = parse_opts(&["decompress", "--memlimit", "0"]);
        assert!(build_decoder_config(&opts).is_err());
    }

    #[test]
    fn verbosity_controls_log_filter() {
        assert_eq!(log_filter(&parse_opts(&["config"])), "warn");
        assert_eq!(log_filter(&parse_opts(&["-v", "config"])), "info");
        assert_eq!(log_filter(&parse_opts(&["-vvvv", "config"])), "trace");
        assert_eq!(log_filter(&parse_opts(&["-q", "config"])), "error");
    }

    #[test]
    fn fuzz_parser_tolerates_garbage() {
        fuzz_try_parse_args(&["compress".into(), "--level".into(), "banana".into()]);
        fuzz_try_parse_args(&[]);
    }

    #[test]
    fn ratio_handles_empty_input() {
        assert_eq!(ratio(32, 0), 0.0);
        assert_eq!(ratio(50, 100), 0.5);
    }
}
