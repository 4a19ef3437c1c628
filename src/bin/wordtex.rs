//! wordtex CLI - Repair the LaTeX pandoc writes for Word documents

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::io::{self, Read};
#[cfg(feature = "cli")]
use tracing_subscriber::EnvFilter;
#[cfg(feature = "cli")]
use wordtex::{
    conditional_preamble, extract_bib_keys, fix_equations, repair_document,
    features::preamble::{ConditionValue, Conditions},
    RepairError, RepairOptions,
};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "wordtex")]
#[command(version)]
#[command(about = "wordtex - Structural repair of Word-generated LaTeX", long_about = None)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input file path (reads from stdin if not provided)
    input_file: Option<String>,

    /// Output file path (writes to stdout if not provided)
    #[arg(short, long)]
    output: Option<String>,

    /// JSON file with repair options
    #[arg(short, long)]
    config: Option<String>,

    /// BibTeX file used to convert hand-written citations
    #[arg(short, long)]
    bib: Option<String>,

    /// Write the repair report as JSON to this path
    #[arg(long)]
    report: Option<String>,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Repair a whole document (default action)
    Repair {
        /// Input file path
        input: Option<String>,

        /// Output file path
        #[arg(short, long)]
        output: Option<String>,

        /// JSON file with repair options
        #[arg(short, long)]
        config: Option<String>,

        /// BibTeX file used to convert hand-written citations
        #[arg(short, long)]
        bib: Option<String>,

        /// Write the repair report as JSON to this path
        #[arg(long)]
        report: Option<String>,
    },

    /// Repair a single Word equation
    Math {
        /// Equation source (reads stdin if not provided)
        equation: Option<String>,
    },

    /// Apply the conditions of a preamble template
    Preamble {
        /// Template file path
        input: Option<String>,

        /// Condition as key=value; may be repeated
        #[arg(short = 's', long = "set")]
        set: Vec<String>,

        /// JSON object of conditions
        #[arg(long)]
        conditions: Option<String>,

        /// Output file path
        #[arg(short, long)]
        output: Option<String>,
    },

    /// List the citation keys of a BibTeX file
    BibKeys {
        /// BibTeX file path
        input: Option<String>,
    },
}

#[cfg(feature = "cli")]
fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("WORDTEX_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Repair {
            input,
            output,
            config,
            bib,
            report,
        }) => run_repair(input, output, config, bib, report),
        Some(Commands::Math { equation }) => {
            let equation = match equation {
                Some(equation) => equation,
                None => read_input(None)?,
            };
            let fixed = fix_equations(equation.trim_end()).map_err(to_io)?;
            println!("{}", fixed);
            Ok(())
        }
        Some(Commands::Preamble {
            input,
            set,
            conditions,
            output,
        }) => {
            let template = read_input(input.as_deref())?;
            let mut keys: Conditions = match conditions {
                Some(path) => serde_json::from_str(&fs::read_to_string(path)?).map_err(|e| to_io(e.into()))?,
                None => Conditions::new(),
            };
            for pair in &set {
                let Some((key, value)) = pair.split_once('=') else {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("condition '{}' is not key=value", pair),
                    ));
                };
                keys.insert(key.trim().to_string(), parse_condition(value.trim()));
            }
            write_output(output.as_deref(), &conditional_preamble(&template, &keys))
        }
        Some(Commands::BibKeys { input }) => {
            let bib = read_input(input.as_deref())?;
            for key in extract_bib_keys(&bib) {
                println!("{}", key);
            }
            Ok(())
        }
        None => run_repair(cli.input_file, cli.output, cli.config, cli.bib, cli.report),
    }
}

#[cfg(feature = "cli")]
fn run_repair(
    input: Option<String>,
    output: Option<String>,
    config: Option<String>,
    bib: Option<String>,
    report: Option<String>,
) -> io::Result<()> {
    let text = read_input(input.as_deref())?;
    let mut options = match config {
        Some(path) => RepairOptions::from_json(&fs::read_to_string(path)?).map_err(to_io)?,
        None => RepairOptions::default(),
    };
    if let Some(path) = bib {
        options.bibliography = Some(fs::read_to_string(path)?);
    }

    let repaired = repair_document(&text, &options).map_err(to_io)?;
    for warning in &repaired.report.warnings {
        eprintln!("{}", warning);
    }
    if let Some(path) = report {
        let json = serde_json::to_string_pretty(&repaired.report).map_err(|e| to_io(e.into()))?;
        fs::write(&path, json)?;
        eprintln!("✓ Report written to: {}", path);
    }
    write_output(output.as_deref(), &repaired.content)
}

#[cfg(feature = "cli")]
fn parse_condition(value: &str) -> ConditionValue {
    if value.eq_ignore_ascii_case("true") {
        ConditionValue::Bool(true)
    } else if value.eq_ignore_ascii_case("false") {
        ConditionValue::Bool(false)
    } else if let Ok(n) = value.parse::<i64>() {
        ConditionValue::Int(n)
    } else {
        ConditionValue::Str(value.to_string())
    }
}

#[cfg(feature = "cli")]
fn read_input(path: Option<&str>) -> io::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

#[cfg(feature = "cli")]
fn write_output(path: Option<&str>, content: &str) -> io::Result<()> {
    match path {
        Some(path) => {
            fs::write(path, content)?;
            eprintln!("✓ Output written to: {}", path);
        }
        None => println!("{}", content),
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn to_io(err: RepairError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err.to_string())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Build with --features cli");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  cargo install wordtex --features cli");
    eprintln!("  wordtex [OPTIONS] [INPUT_FILE]");
}
