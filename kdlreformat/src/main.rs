//! kdlreformat - parse a KDL document and print it back out under a
//! configurable formatting policy.
//!
//! Reads from a file (or stdin), writes to a file (or stdout). Exits
//! non-zero with a positioned error message on stderr if the input isn't
//! valid KDL.

use std::{
    fs,
    io::{self, Read, Write},
    path::PathBuf,
    time::Instant,
};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use knots::{ParseConfig, PrintConfig};

/// Reformat a KDL document
#[derive(Parser, Debug)]
#[command(name = "kdlreformat")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reformat a KDL document", long_about = None)]
struct Cli {
    /// Input file, or - for stdin
    #[arg(default_value = "-")]
    infile: PathBuf,

    /// Output file, or - for stdout
    #[arg(default_value = "-")]
    outfile: PathBuf,

    /// Indentation in spaces per level; -1 means tabs
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    indent: i32,

    /// Terminate every node with a semicolon
    #[arg(long)]
    semicolons: bool,

    /// Keep hex/octal/binary numbers in their source radix (default)
    #[arg(long, overrides_with = "no_radix")]
    radix: bool,

    /// Print every number in decimal
    #[arg(long = "no-radix")]
    no_radix: bool,

    /// Keep raw strings raw (default)
    #[arg(long = "raw-strings", overrides_with = "no_raw_strings")]
    raw_strings: bool,

    /// Print every string in escaped form
    #[arg(long = "no-raw-strings")]
    no_raw_strings: bool,

    /// Exponent character for scientific notation
    #[arg(long, default_value_t = 'e', value_parser = parse_exponent)]
    exponent: char,

    /// Enable verbose logging
    #[arg(short, long, env = "KDLREFORMAT_VERBOSE")]
    verbose: bool,
}

fn parse_exponent(value: &str) -> Result<char, String> {
    match value {
        "e" => Ok('e'),
        "E" => Ok('E'),
        _ => Err("exponent must be e or E".to_owned()),
    }
}

impl Cli {
    fn print_config(&self) -> PrintConfig {
        PrintConfig {
            indent: match self.indent {
                indent if indent < 0 => "\t".to_owned(),
                indent => " ".repeat(indent as usize),
            },
            semicolons: self.semicolons,
            respect_radix: !self.no_radix,
            respect_string_type: !self.no_raw_strings,
            exponent_char: self.exponent,
            ..PrintConfig::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let input = read_input(&cli.infile)?;
    tracing::debug!(bytes = input.len(), "read input");

    // Reformatting is lossless: no native conversions
    let parser = knots::Parser {
        parse_config: ParseConfig {
            native_untagged_values: false,
            native_tagged_values: false,
            ..ParseConfig::default()
        },
        print_config: cli.print_config(),
    };

    let started = Instant::now();
    let document = parser
        .parse(&input)
        .with_context(|| format!("failed to parse {}", cli.infile.display()))?;
    tracing::debug!(nodes = document.nodes.len(), elapsed = ?started.elapsed(), "parsed");

    let output = parser
        .print(&document)
        .context("failed to serialize document")?;

    write_output(&cli.outfile, &output)
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize logging: {error}"))
}

fn read_input(infile: &PathBuf) -> anyhow::Result<String> {
    if infile.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read from stdin")?;
        Ok(buf)
    } else {
        fs::read_to_string(infile).with_context(|| format!("failed to read {}", infile.display()))
    }
}

fn write_output(outfile: &PathBuf, output: &str) -> anyhow::Result<()> {
    if outfile.as_os_str() == "-" {
        io::stdout()
            .write_all(output.as_bytes())
            .context("failed to write to stdout")
    } else {
        fs::write(outfile, output).with_context(|| format!("failed to write {}", outfile.display()))
    }
}
