use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use facetquery_core::{AssemblerConfig, OutputFormat, QueryAssembler, QuerySpec};
use std::io::Read;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "facetquery")]
#[command(about = "Translate faceted search specs into search-engine query strings", long_about = None)]
struct Cli {
    /// Assembler config JSON (field names, default sort).
    #[arg(long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Args)]
struct SpecArgs {
    /// QuerySpec JSON file; reads stdin when omitted or "-".
    spec: Option<String>,
    /// Output format directive, repeatable.
    #[arg(long = "format", value_name = "KEY=VALUE", value_parser = parse_pair)]
    format: Vec<(String, String)>,
    /// Keep documents without an attachment subject.
    #[arg(long)]
    allow_attachmentless: bool,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the assembled query string.
    Assemble(SpecArgs),
    /// Print how each field was translated, and the query string.
    Explain(SpecArgs),
}

fn parse_pair(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", s))?;
    if key.is_empty() {
        return Err(format!("empty key in {:?}", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn read_spec(path: Option<&str>) -> Result<QuerySpec> {
    let data = match path {
        None | Some("-") => {
            let mut s = String::new();
            std::io::stdin().read_to_string(&mut s)?;
            s
        }
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("reading {}", p))?,
    };
    Ok(QuerySpec::from_json(&data)?)
}

impl SpecArgs {
    fn output_format(&self) -> OutputFormat {
        if self.format.is_empty() {
            OutputFormat::json()
        } else {
            OutputFormat::from_pairs(self.format.iter().cloned())
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AssemblerConfig::load(path)?,
        None => AssemblerConfig::default(),
    };
    let assembler = QueryAssembler::new(config);

    match cli.cmd {
        Cmd::Assemble(args) => {
            let spec = read_spec(args.spec.as_deref())?;
            let query = assembler.assemble(&spec, &args.output_format(), !args.allow_attachmentless);
            println!("{}", query);
        }
        Cmd::Explain(args) => {
            let spec = read_spec(args.spec.as_deref())?;
            let fields = assembler.explain(&spec);
            let query = assembler.assemble(&spec, &args.output_format(), !args.allow_attachmentless);
            let report = serde_json::json!({ "fields": fields, "query": query });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
