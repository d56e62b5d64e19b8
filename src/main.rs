use std::path::PathBuf;

use clap::Parser;

use svgclip::{convert, ConversionRequest, Error, Page, PageConfig, Viewport};

/// Export every SVG image embedded in an HTML document as an individually
/// clipped PNG file.
#[derive(Parser, Debug)]
#[command(name = "svgclip", version, about)]
struct Cli {
    /// Path or URL of the HTML document to load
    source: String,

    /// Existing directory to write PNG files into (not created)
    dest: PathBuf,

    /// String inserted immediately before the .png extension, e.g. "@2x"
    #[arg(default_value = "")]
    suffix: String,

    /// Device scale factor; must be positive
    #[arg(default_value_t = 1.0)]
    scale: f64,

    /// Milliseconds to wait after load completion for layout to settle
    #[arg(long, default_value_t = 500)]
    settle_ms: u64,

    /// Upper bound on page load, in milliseconds
    #[arg(long, default_value_t = 30000)]
    timeout_ms: u64,

    /// Browser viewport as WIDTHxHEIGHT
    #[arg(long, default_value = "1280x720", value_parser = parse_viewport)]
    viewport: Viewport,
}

fn parse_viewport(s: &str) -> Result<Viewport, String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let width = w.parse().map_err(|_| format!("bad viewport width '{}'", w))?;
    let height = h.parse().map_err(|_| format!("bad viewport height '{}'", h))?;
    Ok(Viewport { width, height })
}

fn run(cli: Cli) -> svgclip::Result<()> {
    if !cli.dest.is_dir() {
        return Err(Error::ConfigError(format!(
            "destination directory {} does not exist",
            cli.dest.display()
        )));
    }

    let request = ConversionRequest::new(cli.source, cli.dest, cli.suffix, cli.scale)?;
    let config = PageConfig {
        viewport: cli.viewport,
        load_timeout_ms: cli.timeout_ms,
        settle_ms: cli.settle_ms,
    };

    let mut page = svgclip::new_page(config)?;
    let regions = convert(&mut page, &request)?;
    log::info!("rendered {} region(s)", regions.len());
    page.close()
}

/// Single error boundary: every failure kind is formatted here and nowhere
/// else. Load failures get the canonical operator-facing line; script faults
/// get the message plus one stack line per frame.
fn report(err: &Error) {
    match err {
        Error::LoadFailed(detail) => {
            log::debug!("load failure: {}", detail);
            eprintln!("Unable to load the source file.");
        }
        Error::ScriptFault { message, stack } => {
            eprintln!("\nScript Error: {}", message);
            if !stack.is_empty() {
                eprintln!("       Stack:");
                for frame in stack {
                    eprintln!("         -> {}", frame);
                }
            }
            eprintln!();
        }
        other => eprintln!("Error: {}", other),
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        report(&err);
        std::process::exit(1);
    }
}
