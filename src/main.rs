use std::io::Write;

use clap::{CommandFactory, Parser};
use testlog_parser::error::{MissingInputError, ParseError};
use testlog_parser::metrics::TimeUnit;
use testlog_parser::report::{expand_paths, OutputFormat, Reporter};

#[derive(Debug, Parser)]
#[command(
    version = std::env!("CARGO_PKG_VERSION"),
    name = "testlog-parser",
    about = "Prints the tests, metrics and call trees recorded in XML test logs"
)]
struct Cli {
    #[arg(help = "Test log files or glob patterns, e.g. `results/*.xml`.")]
    paths: Vec<String>,
    #[arg(
        long,
        value_enum,
        default_value_t = TimeUnit::Ms,
        env = "TESTLOG_UNITS",
        help = "Unit for timing metrics."
    )]
    units: TimeUnit,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, help = "Output format.")]
    format: OutputFormat,
    #[arg(short, long, help = "Enable debug logging.")]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logger(cli.verbose)?;
    match run(cli) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            log::error!("Error: {:?}", e);
            let exit_code = if e.downcast_ref::<ParseError>().is_some() {
                exitcode::DATAERR
            } else {
                exitcode::SOFTWARE
            };
            std::process::exit(exit_code);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let Cli {
        paths,
        units,
        format,
        ..
    } = cli;

    let paths = match expand_paths(&paths) {
        Ok(paths) => paths,
        Err(e) if e.is::<MissingInputError>() => {
            println!("{}", Cli::command().render_usage());
            return Ok(exitcode::OK);
        }
        Err(e) => return Err(e),
    };

    let stdout = std::io::stdout();
    let mut reporter = Reporter::new(stdout.lock(), format, units);
    for path in &paths {
        reporter.report_file(path)?;
    }
    reporter.into_inner().flush()?;

    log::debug!("Reported {} test logs", paths.len());
    Ok(exitcode::OK)
}

fn setup_logger(verbose: bool) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(
            None,
            if verbose {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Info
            },
        );
    if let Ok(log) = std::env::var("TESTLOG_LOG") {
        builder.parse_filters(&log);
    }
    builder.try_init()?;
    Ok(())
}
