// Command line front end for the ZMBV codec.
//
// Subcommands:
//   encode  raw frames -> record stream
//   decode  record stream -> raw frames or packed 24-bit RGB/BGR
//   info    per-record tag/header listing of a record stream
//   config  build constants

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::codec::EncodeOptions;
use crate::codec::FrameDecoder;
use crate::codec::entropy::DEFAULT_LEVEL;
use crate::export::{ChannelOrder, ExportOptions, Orientation};
use crate::format::{CompressionMode, FrameTag, KeyframeHeader, PixelFormat, VERSION_HIGH, VERSION_LOW};
use crate::io::{self as zio, DEFAULT_KEYFRAME_INTERVAL, EncodeJob, OutputLayout, StreamReader};
use crate::motion::{BORDER, MAX_DIMENSION, MAX_SEARCH_RADIUS, SearchConfig, VECTOR_COUNT};

const BUF_SIZE: usize = 64 * 1024;
const DEFAULT_BLOCK_SIZE: u8 = 16;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// ZMBV (Zip Motion Block Video) encoder/decoder.
#[derive(Parser, Debug)]
#[command(
    name = "zmbv",
    version,
    about = "ZMBV motion-block video encoder/decoder",
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
    /// Encode raw frames into a record stream.
    Encode(EncodeArgs),
    /// Decode a record stream.
    Decode(DecodeArgs),
    /// List the records of a stream.
    Info(InfoArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SearchArg {
    Reference,
    Exhaustive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LayoutArg {
    /// Same layout as encoder input.
    Raw,
    /// Packed 24-bit RGB.
    Rgb,
    /// Packed 24-bit BGR.
    Bgr,
}

#[derive(Args, Debug)]
struct FrameSizeArgs {
    /// Frame width in pixels.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_DIMENSION as i64))]
    width: u32,

    /// Frame height in pixels.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_DIMENSION as i64))]
    height: u32,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    #[command(flatten)]
    size: FrameSizeArgs,

    /// Bits per pixel of the input frames (8, 15, 16 or 32).
    #[arg(long, default_value_t = 8, value_parser = parse_bpp)]
    bpp: u32,

    /// Every n-th frame is a keyframe (0: only the first).
    #[arg(long = "keyframe-interval", default_value_t = DEFAULT_KEYFRAME_INTERVAL)]
    keyframe_interval: u32,

    /// Deflate level (0-9).
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u32).range(0..=9), default_value_t = DEFAULT_LEVEL)]
    level: u32,

    /// Store payloads without zlib.
    #[arg(long = "no-compress")]
    no_compress: bool,

    /// Square block size in pixels.
    #[arg(long = "block-size", value_parser = clap::value_parser!(u8).range(1..), default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: u8,

    /// Motion search profile.
    #[arg(long, value_enum, default_value_t = SearchArg::Reference)]
    search: SearchArg,

    /// Input file (default: stdin).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "input_pos")]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "output_pos")]
    output: Option<PathBuf>,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Input file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    input_pos: Option<PathBuf>,

    /// Output file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    output_pos: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    #[command(flatten)]
    size: FrameSizeArgs,

    /// Output layout.
    #[arg(long, value_enum, default_value_t = LayoutArg::Raw)]
    format: LayoutArg,

    /// Write RGB/BGR rows bottom-up.
    #[arg(long)]
    flip: bool,

    /// Pad RGB/BGR rows to a multiple of 4 bytes.
    #[arg(long = "align-rows")]
    align_rows: bool,

    /// Decode and verify only (do not write output).
    #[arg(long = "check-only")]
    no_output: bool,

    /// Input file (default: stdin).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "input_pos")]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "output_pos")]
    output: Option<PathBuf>,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Input file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    input_pos: Option<PathBuf>,

    /// Output file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    output_pos: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Record stream file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
}

fn parse_bpp(s: &str) -> Result<u32, String> {
    let bpp: u32 = s.trim().parse().map_err(|e| format!("invalid bpp '{s}': {e}"))?;
    PixelFormat::from_bpp(bpp)
        .map(|_| bpp)
        .map_err(|_| format!("unsupported bpp {bpp} (expected 8, 15, 16 or 32)"))
}

// ---------------------------------------------------------------------------
// Resolved options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Encode,
    Decode,
    Info,
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
    no_output: bool,
    width: usize,
    height: usize,
    bpp: u32,
    keyframe_interval: u32,
    encode: EncodeOptions,
    layout: LayoutArg,
    flip: bool,
    align_rows: bool,
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
            verbose: cli.verbose.min(2),
            json_output: cli.json_output,
            no_output: false,
            width: 0,
            height: 0,
            bpp: 8,
            keyframe_interval: DEFAULT_KEYFRAME_INTERVAL,
            encode: EncodeOptions::default(),
            layout: LayoutArg::Raw,
            flip: false,
            align_rows: false,
            input_file: None,
            output_file: None,
        }
    }
}

fn resolve_options(cli: Cli) -> Options {
    match &cli.command {
        Cmd::Encode(args) => {
            let block = args.block_size;
            Options {
                use_stdout: args.stdout,
                width: args.size.width as usize,
                height: args.size.height as usize,
                bpp: args.bpp,
                keyframe_interval: args.keyframe_interval,
                encode: EncodeOptions {
                    level: args.level,
                    compression: if args.no_compress {
                        CompressionMode::None
                    } else {
                        CompressionMode::Zlib
                    },
                    block_width: block,
                    block_height: block,
                    search: match args.search {
                        SearchArg::Reference => SearchConfig::REFERENCE,
                        SearchArg::Exhaustive => SearchConfig::EXHAUSTIVE,
                    },
                },
                input_file: args.input.clone().or(args.input_pos.clone()),
                output_file: args.output.clone().or(args.output_pos.clone()),
                ..Options::base(Command::Encode, &cli)
            }
        }
        Cmd::Decode(args) => Options {
            use_stdout: args.stdout,
            no_output: args.no_output,
            width: args.size.width as usize,
            height: args.size.height as usize,
            layout: args.format,
            flip: args.flip,
            align_rows: args.align_rows,
            input_file: args.input.clone().or(args.input_pos.clone()),
            output_file: args.output.clone().or(args.output_pos.clone()),
            ..Options::base(Command::Decode, &cli)
        },
        Cmd::Info(args) => Options {
            input_file: Some(args.input.clone()),
            ..Options::base(Command::Info, &cli)
        },
        Cmd::Config => Options::base(Command::Config, &cli),
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("zmbv".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => eprintln!("{s}"),
        Err(e) => eprintln!("zmbv: json error: {e}"),
    }
}

fn hex_digest(digest: Option<[u8; 32]>) -> Option<String> {
    digest.map(|d| d.iter().map(|b| format!("{b:02x}")).collect())
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>, String> {
    match path {
        Some(path) => File::open(path)
            .map(|f| Box::new(BufReader::with_capacity(BUF_SIZE, f)) as Box<dyn Read>)
            .map_err(|e| format!("input file: {}: {e}", path.display())),
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn check_overwrite(path: &Path, force: bool) -> Result<(), String> {
    if path.exists() && !force {
        return Err(format!(
            "output file exists, use -f to overwrite: {}",
            path.display()
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("zmbv version {version} (Rust)");

    let file_io = cfg!(feature = "file-io") as u8;
    let search = SearchConfig::REFERENCE;

    eprintln!("FILE_IO={file_io}");
    eprintln!("STREAM_VERSION={VERSION_HIGH}.{VERSION_LOW}");
    eprintln!("DEFAULT_LEVEL={DEFAULT_LEVEL}");
    eprintln!("DEFAULT_BLOCK_SIZE={DEFAULT_BLOCK_SIZE}");
    eprintln!("DEFAULT_KEYFRAME_INTERVAL={DEFAULT_KEYFRAME_INTERVAL}");
    eprintln!("BORDER={BORDER}");
    eprintln!("MAX_DIMENSION={MAX_DIMENSION}");
    eprintln!("MAX_SEARCH_RADIUS={MAX_SEARCH_RADIUS}");
    eprintln!("VECTOR_COUNT={VECTOR_COUNT}");
    eprintln!("SEARCH_COARSE_STRIDE={}", search.coarse_stride);
    eprintln!("SEARCH_THRESHOLD={}", search.threshold);
    eprintln!("SEARCH_ATTEMPTS={}", search.detailed_attempts);

    0
}

// ---------------------------------------------------------------------------
// Encode command
// ---------------------------------------------------------------------------

fn cmd_encode(opts: &Options) -> i32 {
    let format = match PixelFormat::from_bpp(opts.bpp) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("zmbv: {e}");
            return 1;
        }
    };
    let job = EncodeJob {
        keyframe_interval: opts.keyframe_interval,
        options: opts.encode,
        ..EncodeJob::new(opts.width, opts.height, format)
    };

    let input = match open_input(opts.input_file.as_deref()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("zmbv: {e}");
            return 1;
        }
    };

    // The stream header is patched at the end, so stdout output is staged in
    // memory.
    let result = match (opts.use_stdout, &opts.output_file) {
        (true, _) | (_, None) => zio::encode_stream(input, Cursor::new(Vec::new()), &job)
            .and_then(|(cursor, stats)| {
                let mut out = io::stdout().lock();
                out.write_all(cursor.get_ref())?;
                out.flush()?;
                Ok(stats)
            }),
        (false, Some(path)) => {
            if let Err(e) = check_overwrite(path, opts.force) {
                eprintln!("zmbv: {e}");
                return 1;
            }
            match File::create(path) {
                Ok(f) => zio::encode_stream(input, BufWriter::with_capacity(BUF_SIZE, f), &job)
                    .and_then(|(mut w, stats)| {
                        w.flush()?;
                        Ok(stats)
                    }),
                Err(e) => {
                    eprintln!("zmbv: output file: {}: {e}", path.display());
                    return 1;
                }
            }
        }
    };

    let stats = match result {
        Ok(s) => s,
        Err(e) => {
            eprintln!("zmbv: encode error: {e}");
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "zmbv: encoder: frames: {}, keyframes: {}, input size: {}, output size: {}",
            stats.frames, stats.keyframes, stats.input_size, stats.output_size
        );
    }
    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "encode",
            "width": opts.width,
            "height": opts.height,
            "bpp": opts.bpp,
            "frames": stats.frames,
            "keyframes": stats.keyframes,
            "input_size": stats.input_size,
            "output_size": stats.output_size,
            "level": opts.encode.level,
            "compression": opts.encode.compression.code(),
            "input_sha256": hex_digest(stats.input_sha256),
        }));
    }
    0
}

// ---------------------------------------------------------------------------
// Decode command
// ---------------------------------------------------------------------------

fn cmd_decode(opts: &Options) -> i32 {
    let layout = match opts.layout {
        LayoutArg::Raw => OutputLayout::Raw,
        LayoutArg::Rgb | LayoutArg::Bgr => OutputLayout::Rgb24(ExportOptions {
            channel_order: if opts.layout == LayoutArg::Bgr {
                ChannelOrder::Bgr
            } else {
                ChannelOrder::Rgb
            },
            orientation: if opts.flip {
                Orientation::BottomUp
            } else {
                Orientation::TopDown
            },
            align_rows: opts.align_rows,
        }),
    };

    let input = match open_input(opts.input_file.as_deref()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("zmbv: {e}");
            return 1;
        }
    };

    let output: Box<dyn Write> = if opts.no_output {
        Box::new(io::sink())
    } else {
        match (opts.use_stdout, &opts.output_file) {
            (true, _) | (_, None) => {
                Box::new(BufWriter::with_capacity(BUF_SIZE, io::stdout().lock()))
            }
            (false, Some(path)) => {
                if let Err(e) = check_overwrite(path, opts.force) {
                    eprintln!("zmbv: {e}");
                    return 1;
                }
                match File::create(path) {
                    Ok(f) => Box::new(BufWriter::with_capacity(BUF_SIZE, f)),
                    Err(e) => {
                        eprintln!("zmbv: output file: {}: {e}", path.display());
                        return 1;
                    }
                }
            }
        }
    };

    let stats = match zio::decode_stream(input, output, opts.width, opts.height, layout) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("zmbv: decode error: {e}");
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "zmbv: decoder: frames: {}, keyframes: {}, output size: {}",
            stats.frames, stats.keyframes, stats.output_size
        );
    }
    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "decode",
            "frames": stats.frames,
            "keyframes": stats.keyframes,
            "input_size": stats.input_size,
            "output_size": stats.output_size,
            "output_sha256": hex_digest(stats.output_sha256),
        }));
    }
    0
}

// ---------------------------------------------------------------------------
// Info command
// ---------------------------------------------------------------------------

fn describe_record(record: &[u8]) -> String {
    let Some(&tag_byte) = record.first() else {
        return "empty record".to_string();
    };
    let tag = match FrameTag::parse(tag_byte) {
        Ok(t) => t,
        Err(e) => return format!("tag {tag_byte:#04x}: {e}"),
    };
    let palette = if FrameDecoder::palette_changed(record) {
        ", palette"
    } else {
        ""
    };
    if !tag.is_keyframe() {
        return format!("delta{palette}");
    }
    match KeyframeHeader::decode(&record[1..]) {
        Ok(h) => format!(
            "keyframe {} {:?} blocks {}x{}{palette}",
            h.format, h.compression, h.block_width, h.block_height
        ),
        Err(e) => format!("keyframe: {e}"),
    }
}

fn cmd_info(opts: &Options) -> i32 {
    let Some(path) = opts.input_file.as_deref() else {
        eprintln!("zmbv: info: no input file");
        return 1;
    };
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("zmbv: input file: {}: {e}", path.display());
            return 1;
        }
    };
    let mut reader = match StreamReader::new(BufReader::with_capacity(BUF_SIZE, file)) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("zmbv: {}: {e}", path.display());
            return 1;
        }
    };
    let index = match reader.keyframe_index() {
        Ok(i) => i,
        Err(e) => {
            eprintln!("zmbv: keyframe index: {e}");
            return 1;
        }
    };

    if !opts.quiet && !opts.json_output {
        println!(
            "frames: {}, keyframe index: {} entries at {}",
            reader.frame_count(),
            index.len(),
            reader.index_offset()
        );
    }

    let mut records = Vec::new();
    let mut buf = Vec::new();
    let mut offset = zio::STREAM_HEADER_LEN;
    let mut n = 0u32;
    loop {
        let size = match reader.next_record(&mut buf) {
            Ok(Some(size)) => size,
            Ok(None) => break,
            Err(e) => {
                eprintln!("zmbv: record {n}: {e}");
                return 1;
            }
        };
        let description = describe_record(&buf);
        if opts.json_output {
            records.push(serde_json::json!({
                "frame": n,
                "offset": offset,
                "size": size,
                "tag": buf.first().copied().unwrap_or(0),
                "description": description,
            }));
        } else if !opts.quiet {
            println!("{n:6} @{offset:<10} {size:8} bytes  {description}");
        }
        offset += 4 + size as u64;
        n += 1;
    }

    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "info",
            "frames": reader.frame_count(),
            "keyframe_index": index,
            "records": records,
        }));
    }
    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let filter = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let mut opts = resolve_options(cli);

    if opts.use_stdout && opts.output_file.is_some() && !opts.quiet {
        if let Some(path) = &opts.output_file {
            eprintln!(
                "zmbv: warning: -c option overrides output filename: {}",
                path.display()
            );
        }
        opts.output_file = None;
    }

    let exit_code = match opts.command {
        Command::Encode => cmd_encode(&opts),
        Command::Decode => cmd_decode(&opts),
        Command::Info => cmd_info(&opts),
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
        let argv: Vec<String> = std::iter::once("zmbv".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        let cli = Cli::try_parse_from(argv).expect("cli parse failed");
        resolve_options(cli)
    }

    fn parse_fails(args: &[&str]) -> bool {
        let argv: Vec<String> = std::iter::once("zmbv".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        Cli::try_parse_from(argv).is_err()
    }

    #[test]
    fn encode_defaults() {
        let o = parse_opts(&["encode", "--width", "320", "--height", "200", "in.raw", "out.zmbv"]);
        assert_eq!(o.command, Command::Encode);
        assert_eq!((o.width, o.height, o.bpp), (320, 200, 8));
        assert_eq!(o.keyframe_interval, 300);
        assert_eq!(o.encode, EncodeOptions::default());
        assert_eq!(o.input_file.as_deref(), Some(Path::new("in.raw")));
        assert_eq!(o.output_file.as_deref(), Some(Path::new("out.zmbv")));
    }

    #[test]
    fn encode_tuning_flags() {
        let o = parse_opts(&[
            "encode",
            "--width",
            "8",
            "--height",
            "8",
            "--bpp",
            "32",
            "--no-compress",
            "--block-size",
            "8",
            "-l",
            "9",
            "--search",
            "exhaustive",
        ]);
        assert_eq!(o.bpp, 32);
        assert_eq!(o.encode.compression, CompressionMode::None);
        assert_eq!((o.encode.block_width, o.encode.block_height), (8, 8));
        assert_eq!(o.encode.level, 9);
        assert_eq!(o.encode.search, SearchConfig::EXHAUSTIVE);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse_fails(&["encode", "--width", "8", "--height", "8", "--bpp", "24"]));
        assert!(parse_fails(&["encode", "--width", "0", "--height", "8"]));
        assert!(parse_fails(&["encode", "--width", "8", "--height", "16385"]));
        assert!(parse_fails(&["encode", "--width", "8", "--height", "8", "--block-size", "0"]));
        assert!(parse_fails(&["encode", "--width", "8", "--height", "8", "-l", "10"]));
        assert!(parse_fails(&["encode", "--height", "8"]));
        assert!(parse_fails(&["-q", "-v", "config"]));
    }

    #[test]
    fn decode_layout_flags() {
        let o = parse_opts(&[
            "decode", "--width", "4", "--height", "4", "--format", "bgr", "--flip", "--align-rows",
            "-c", "in.zmbv",
        ]);
        assert_eq!(o.command, Command::Decode);
        assert_eq!(o.layout, LayoutArg::Bgr);
        assert!(o.flip && o.align_rows && o.use_stdout);
        assert_eq!(o.input_file.as_deref(), Some(Path::new("in.zmbv")));
    }

    #[test]
    fn global_flags() {
        let o = parse_opts(&["--json", "-f", "-vvv", "info", "a.zmbv"]);
        assert_eq!(o.command, Command::Info);
        assert!(o.json_output && o.force);
        assert_eq!(o.verbose, 2);
    }

    #[test]
    fn record_descriptions() {
        assert_eq!(describe_record(&[]), "empty record");
        assert_eq!(describe_record(&[0x00, 0x78]), "delta");
        assert_eq!(describe_record(&[0x02, 0x78]), "delta, palette");
        assert_eq!(
            describe_record(&[0x01, 0, 1, 1, 0x04, 16, 16, 0x78]),
            "keyframe 8bpp Zlib blocks 16x16, palette"
        );
        assert!(describe_record(&[0x01, 9, 9, 1, 0x04, 16, 16]).starts_with("keyframe: "));
        assert!(describe_record(&[0x80]).starts_with("tag 0x80"));
    }

    #[test]
    fn fuzz_entry_accepts_garbage() {
        fuzz_try_parse_args(&["--nope".to_string()]);
        fuzz_try_parse_args(&["decode".to_string(), "--width".to_string()]);
    }
}
