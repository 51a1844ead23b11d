//! dviz CLI - Render declarative chart annotations in Markdown or HTML

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use dviz::{
    core::runner::markdown_document, from_html, DvizError, Dviz, FailurePolicy, RunOptions, RunReport,
};
#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::io::{self, Read, Write};
#[cfg(feature = "cli")]
use tracing_subscriber::EnvFilter;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "dviz")]
#[command(version)]
#[command(about = "dviz - Declarative charts from annotated Markdown", long_about = None)]
struct Cli {
    /// Input file, Markdown unless --html is given (reads from stdin if not provided)
    input_file: Option<String>,

    /// Output file path (writes to stdout if not provided)
    #[arg(short, long)]
    output: Option<String>,

    /// TOML file with run options; flags below override it
    #[arg(long)]
    config: Option<String>,

    /// Selector for the content region
    #[arg(long)]
    content_selector: Option<String>,

    /// Selector for annotated code nodes
    #[arg(long)]
    code_selector: Option<String>,

    /// Library load timeout in seconds (0 waits forever)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Keep going when a command fails and report failures at the end
    #[arg(long)]
    isolate_failures: bool,

    /// Emit a complete HTML page instead of a fragment
    #[arg(long, conflicts_with = "html")]
    standalone: bool,

    /// Treat the input as an HTML page and process its content regions in place
    #[arg(long)]
    html: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// List available commands and the libraries they need, then exit
    #[arg(long)]
    list: bool,
}

#[cfg(feature = "cli")]
fn main() -> io::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = match build_options(&cli) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("Error: {}", err);
            std::process::exit(2);
        }
    };
    let dviz = Dviz::with_options(options);

    if cli.list {
        print_commands(&dviz);
        return Ok(());
    }

    // Read input
    let input = match cli.input_file {
        Some(ref path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let mut doc = if cli.html {
        from_html(&input)
    } else {
        markdown_document(&input, cli.standalone)
    };
    let report = match runtime.block_on(dviz.run(&mut doc)) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Error: {}", err);
            std::process::exit(1);
        }
    };

    if !report.failures.is_empty() {
        print_failures(&report);
    }

    let result = if cli.standalone {
        format!("<!DOCTYPE html>\n{}", doc.to_html())
    } else {
        doc.to_html()
    };

    // Output
    match cli.output {
        Some(path) => {
            let mut file = fs::File::create(&path)?;
            writeln!(file, "{}", result)?;
            if report.failures.is_empty() {
                eprintln!("✓ Output written to: {} ({} rendered)", path, report.rendered);
            } else {
                eprintln!(
                    "⚠ Output written to: {} ({} failed)",
                    path,
                    report.failures.len()
                );
            }
        }
        None => {
            println!("{}", result);
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .try_init();
}

/// Config file first, then flags
#[cfg(feature = "cli")]
fn build_options(cli: &Cli) -> Result<RunOptions, DvizError> {
    let mut options = match cli.config {
        Some(ref path) => RunOptions::from_toml_str(&fs::read_to_string(path)?)?,
        None => RunOptions::default(),
    };

    if let Some(ref selector) = cli.content_selector {
        options.content_selector = selector.clone();
    }
    if let Some(ref selector) = cli.code_selector {
        options.code_selector = selector.clone();
    }
    if let Some(secs) = cli.timeout_secs {
        options.load_timeout_secs = (secs > 0).then_some(secs);
    }
    if cli.isolate_failures {
        options.failure_policy = FailurePolicy::Isolate;
    }

    // Fail on bad selectors before reading any input
    options.scan_options()?;
    Ok(options)
}

#[cfg(feature = "cli")]
fn print_commands(dviz: &Dviz) {
    let registry = dviz.registry();
    for name in registry.names() {
        let requires = registry.requires(name);
        if requires.is_empty() {
            println!("{}", name);
        } else {
            println!("{:<14} requires: {}", name, requires.join(", "));
        }
    }
}

#[cfg(feature = "cli")]
fn print_failures(report: &RunReport) {
    eprintln!();
    eprintln!("Failed commands ({}):", report.failures.len());
    eprintln!();
    for failure in &report.failures {
        eprintln!("  {}", failure);
    }
    eprintln!();
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Build with --features cli");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  cargo install dviz --features cli");
    eprintln!("  dviz [OPTIONS] [INPUT_FILE]");
}
