use ariane_xml::{
    ExecutorConfig,
    cli::{self, CliError, OutputFormat, RunOptions, RunResult},
    templates,
};
use clap::Parser as ClapParser;
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    io::{self, Read},
    path::PathBuf,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(ClapParser)]
#[command(name = "ariane-xml")]
#[command(about = "Ariane-XML - SQL-like queries over collections of XML documents")]
#[command(version)]
struct Cli {
    /// The query to execute (read from stdin if not provided)
    query: Option<String>,

    /// Run a predefined DSN query instead (see --list-templates)
    #[arg(short, long, conflicts_with = "query")]
    template: Option<String>,

    /// Template parameter as key=value, repeatable
    #[arg(short = 'P', long = "param", value_parser = templates::parse_assignment)]
    params: Vec<(String, String)>,

    /// List the predefined DSN queries and exit
    #[arg(long)]
    list_templates: bool,

    /// DSN schema (JSON) for expanding short codes such as 30_001
    #[arg(long, env = "ARIANE_XML_SCHEMA")]
    schema: Option<PathBuf>,

    /// Number of worker threads (detected by default)
    #[arg(short = 'j', long, env = "ARIANE_XML_THREADS")]
    threads: Option<usize>,

    /// Output format: json or tsv
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(short, long)]
    pretty: bool,

    /// Only validate syntax, don't execute
    #[arg(long)]
    syntax_only: bool,

    /// Show a progress bar while files are processed
    #[arg(long)]
    progress: bool,

    /// Log execution details and ambiguous fields to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "ariane_xml=info" } else { "ariane_xml=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn read_query(query: Option<String>) -> Result<String, CliError> {
    let query = match query {
        Some(q) => q,
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
        None => return Err(CliError::NoQuery),
    };
    if query.trim().is_empty() {
        return Err(CliError::NoQuery);
    }
    Ok(query)
}

fn run(cli: Cli) -> Result<(), CliError> {
    if cli.list_templates {
        print!("{}", cli::templates_to_text(templates::builtin()));
        return Ok(());
    }

    let query = match &cli.template {
        Some(name) => templates::expand(name, &cli.params)?,
        None => read_query(cli.query)?,
    };
    let options = RunOptions {
        query,
        schema: cli.schema,
        syntax_only: cli.syntax_only,
        diagnose: cli.verbose,
        executor: ExecutorConfig {
            threads: cli.threads,
            ..Default::default()
        },
    };

    let bar = cli.progress.then(|| {
        let pb = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    });
    let progress = |done: usize, total: usize, threads: usize| {
        if let Some(pb) = &bar {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
            pb.set_message(format!("({} thread(s))", threads));
        }
    };

    let result = cli::run_query(&options, &progress);
    if let Some(pb) = &bar {
        pb.finish_and_clear();
    }

    let result = result?;
    for notice in cli::notices(&result) {
        eprintln!("Warning: {}", notice);
    }

    match result {
        RunResult::SyntaxValid => println!("Syntax is valid"),
        RunResult::Rows { rows, .. } => match cli.format {
            OutputFormat::Json => println!("{}", cli::rows_to_json(&rows, cli.pretty)?),
            OutputFormat::Tsv => print!("{}", cli::rows_to_tsv(&rows)),
        },
    }
    Ok(())
}
