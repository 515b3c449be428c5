use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use flipjump::{load_any, AnyImage, Engine, IoBridge, LoadedImage, RuntimeFlags, Word};

struct Args {
    image_path: String,
    silent: bool,
    // Reserved runtime flag word: accepted and currently ignored.
    #[allow(dead_code)]
    flags: RuntimeFlags,
    // Debug-symbol file path: not consumed by the core.
    debug_symbols: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut image_path = None;
    let mut silent = false;
    let mut flags = RuntimeFlags::empty();
    let mut debug_symbols = None;

    let usage = "usage: flipjump [-s|--silent] [-f|--flags <u64>] [-d|--debug <path>] <image.fjm>";

    let mut argv = std::env::args().skip(1);
    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "-s" | "--silent" => silent = true,
            "-h" | "--help" => return Err(usage.to_string()),
            "-f" | "--flags" => {
                let value = argv.next().ok_or_else(|| format!("{arg} requires a value"))?;
                let bits = parse_u64(&value).ok_or_else(|| format!("invalid flag word: {value}"))?;
                flags = RuntimeFlags::from_bits_retain(bits);
            }
            "-d" | "--debug" => {
                debug_symbols = Some(argv.next().ok_or_else(|| format!("{arg} requires a value"))?);
            }
            other if image_path.is_none() => image_path = Some(other.to_string()),
            other => return Err(format!("unexpected argument: {other}")),
        }
    }

    let image_path = image_path.ok_or_else(|| "missing required <image.fjm> argument".to_string())?;
    Ok(Args {
        image_path,
        silent,
        flags,
        debug_symbols,
    })
}

fn parse_u64(s: &str) -> Option<u64> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

pub fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = &args.debug_symbols {
        log::debug!("debug-symbol file {path} accepted but not consumed by the core");
    }

    let file = match File::open(&args.image_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("failed to open {}: {e}", args.image_path);
            return ExitCode::FAILURE;
        }
    };

    let image = match load_any(io::BufReader::new(file)) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("failed to load image: {e}");
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let out = BufWriter::new(stdout.lock());

    let result = match image {
        AnyImage::W8(img) => run_width(img, stdin.lock(), out),
        AnyImage::W16(img) => run_width(img, stdin.lock(), out),
        AnyImage::W32(img) => run_width(img, stdin.lock(), out),
        AnyImage::W64(img) => run_width(img, stdin.lock(), out),
    };

    match result {
        Ok(report) => {
            if !args.silent {
                eprintln!("{report}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("execution error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_width<W: Word, Out: Write>(
    image: LoadedImage<W>,
    input: impl io::Read,
    output: Out,
) -> Result<String, flipjump::EngineError> {
    let io = IoBridge::new(input, output);
    let mut engine = Engine::new(image.memory, io, image.config);
    engine.run()?;
    Ok(engine.stats().report())
}
