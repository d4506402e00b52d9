//! doxyrst: turn a Doxygen compound XML file into Breathe directives.
//!
//! Every exported function becomes a `.. doxygenfunction::` block that Sphinx
//! (see `sphinx-conf/conf.py`) resolves against the same Doxygen XML:
//!
//! ```text
//! doxyrst docs/xml/classavx_1_1Int256.xml -o docs/int256.rst
//! ```

mod error;
mod model;
mod parser;
mod prototype;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use std::ffi::OsString;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "doxyrst",
    about = "Extract function prototypes from Doxygen XML as reStructuredText directives"
)]
struct Cli {
    /// Source filename (Doxygen compound XML)
    filename: PathBuf,

    /// Output filename
    #[arg(short = 'o', long, default_value = "o.rst")]
    output: PathBuf,

    /// Breathe project written on each `:project:` line
    #[arg(long, default_value = render::DEFAULT_PROJECT)]
    project: String,

    /// Namespace prefix the qualified names start at
    #[arg(long, default_value = prototype::DEFAULT_NAMESPACE)]
    namespace: String,

    /// Section kind to export (repeatable)
    #[arg(
        long = "kind",
        value_parser = clap::builder::PossibleValuesParser::new(model::RECOGNIZED_KINDS.iter().copied()),
        default_values_t = model::DEFAULT_EXPORTED_KINDS.iter().map(|k| k.to_string()).collect::<Vec<_>>()
    )]
    kinds: Vec<String>,

    /// Log each section and member as it is processed
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    init_logging(cli.verbose);
    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let filter = model::KindFilter::new(cli.kinds.iter().cloned());

    // Parse fully before touching the output so bad input never creates it.
    let doc = parser::parse_file(&cli.filename, &filter)?;
    let prototypes = prototype::extract(&doc, &cli.namespace);
    tracing::debug!(
        sections = doc.sections.len(),
        members = doc.member_count(),
        functions = prototypes.len(),
        "extracted prototypes"
    );

    let file = File::create(&cli.output)
        .with_context(|| format!("failed to create {}", cli.output.display()))?;
    let mut out = BufWriter::new(file);
    render::render(&prototypes, &cli.project, &mut out)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    println!("Results saved to {}", cli.output.display());
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "doxyrst=debug" } else { "doxyrst=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Accept the single-dash long spelling `-output` as `--output`.
/// clap would otherwise read it as `-o utput`.
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut past_separator = false;
    args.into_iter()
        .map(|arg| {
            if past_separator {
                return arg;
            }
            match arg.to_str() {
                Some("--") => {
                    past_separator = true;
                    arg
                }
                Some("-output") => OsString::from("--output"),
                Some(s) if s.starts_with("-output=") => OsString::from(format!("-{s}")),
                _ => arg,
            }
        })
        .collect()
}
