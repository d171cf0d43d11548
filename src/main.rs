use std::time::Duration;

use chainemit::format::{Formatter, OutcomeSummary, PlainFormatter, PrettyFormatter};
use chainemit::prelude::*;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use log::{debug, info};

#[cfg(feature = "json")]
use chainemit::format::JsonFormatter;

type Args = Vec<String>;

#[derive(Parser)]
#[command(name = "chainemit", version, about = "Replay emitter scenarios and emit ad-hoc events")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (can be used multiple times: -v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode: suppress listener output, show only outcomes
    #[arg(short = 'q', long = "quiet", global = true)]
    quiet: bool,

    /// Outcome output format
    #[arg(long = "format", global = true, value_enum, default_value_t = OutcomeFormat::Pretty)]
    format: OutcomeFormat,

    /// Listeners per event name before a leak warning is logged (0 = unlimited)
    #[arg(long = "max-listeners", global = true, default_value_t = chainemit::config::DEFAULT_MAX_LISTENERS)]
    max_listeners: usize,
}

#[derive(Clone, ValueEnum, Debug)]
enum OutcomeFormat {
    /// Colorized, human-friendly output (default)
    Pretty,
    /// Single-line, no color output for piping
    Plain,
    /// JSON output for machine consumption
    Json,
}

#[derive(Clone, Copy, ValueEnum, Debug, PartialEq, Eq)]
enum Scenario {
    /// A single synchronous listener
    Sync,
    /// A continuation-style listener that completes after a delay
    Async,
    /// A wildcard listener receiving a named event
    Global,
    /// The first listener stops propagation of a stoppable event
    Stoppable,
    /// A synchronous listener fails
    SyncError,
    /// A continuation-style listener fails
    AsyncError,
}

impl Scenario {
    const ALL: [Scenario; 6] = [
        Scenario::Sync,
        Scenario::Async,
        Scenario::Global,
        Scenario::Stoppable,
        Scenario::SyncError,
        Scenario::AsyncError,
    ];
}

#[derive(Subcommand)]
enum Commands {
    /// Replay example scenarios (all of them when none are given)
    Demo {
        #[arg(value_enum)]
        scenarios: Vec<Scenario>,
        /// Delay used by continuation-style listeners, in milliseconds
        #[arg(long = "delay-ms", default_value_t = 250)]
        delay_ms: u64,
    },
    /// Emit one event through a wildcard and a named listener
    Emit {
        /// Event name
        name: String,
        /// Arguments handed to the listeners
        args: Vec<String>,
        /// Emit a stoppable event and stop it in the wildcard listener
        #[arg(long)]
        stop: bool,
        /// Make the named listener fail with this message
        #[arg(long)]
        fail: Option<String>,
    },
}

/// Prints outcomes in the format chosen on the command line
struct Reporter {
    formatter: Box<dyn Formatter>,
}

impl Reporter {
    fn new(format: OutcomeFormat) -> Self {
        let formatter: Box<dyn Formatter> = match format {
            OutcomeFormat::Pretty => Box::new(PrettyFormatter::new()),
            OutcomeFormat::Plain => Box::new(PlainFormatter::new()),
            #[cfg(feature = "json")]
            OutcomeFormat::Json => Box::new(JsonFormatter::new()),
            #[cfg(not(feature = "json"))]
            OutcomeFormat::Json => {
                eprintln!("Warning: JSON format requested but not enabled. Using plain format.");
                Box::new(PlainFormatter::new())
            }
        };
        Self { formatter }
    }

    fn outcome(&self, outcome: &Outcome<Args>) {
        println!("{}", self.formatter.format(&OutcomeSummary::from(outcome)));
    }
}

/// Build a listener that prints `label` (unless quiet)
fn say(label: &'static str, quiet: bool) -> Listener<Args> {
    Listener::infallible(move |_, _| {
        if !quiet {
            println!("{label}");
        }
    })
}

fn emitter(cli: &Cli) -> Emitter<Args> {
    Emitter::with_config(EmitterConfig::new().with_max_listeners(cli.max_listeners))
}

async fn run_scenario(cli: &Cli, scenario: Scenario, delay: Duration) -> Result<Outcome<Args>> {
    let quiet = cli.quiet;
    let emitter = emitter(cli);
    debug!("running scenario {scenario:?}");

    match scenario {
        Scenario::Sync => {
            emitter.on("test", say("listener #1", quiet))?;
            emitter.dispatch("test", Args::new()).await
        }
        Scenario::Async => {
            emitter.on(
                "test",
                Listener::with_next(move |_, _, next| {
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        if !quiet {
                            println!("listener #1");
                        }
                        next.done();
                    });
                }),
            )?;
            emitter.dispatch("test", Args::new()).await
        }
        Scenario::Global => {
            emitter.on_any(say("listener #1", quiet));
            emitter.dispatch("test", Args::new()).await
        }
        Scenario::Stoppable => {
            emitter
                .on(
                    "test",
                    Listener::infallible(move |event, _| {
                        if !quiet {
                            println!("listener #1");
                        }
                        event.stop_propagation();
                    }),
                )?
                .on("test", say("listener #2", quiet))?;
            emitter.dispatch(Event::<Args>::stoppable("test"), Args::new()).await
        }
        Scenario::SyncError => {
            emitter.on(
                "test",
                Listener::sync(move |_, _| {
                    if !quiet {
                        println!("listener #1");
                    }
                    Err("A test error".into())
                }),
            )?;
            emitter.dispatch("test", Args::new()).await
        }
        Scenario::AsyncError => {
            emitter.on(
                "test",
                Listener::with_next(move |_, _, next| {
                    if !quiet {
                        println!("listener #1");
                    }
                    next.fail("A test error");
                }),
            )?;
            emitter.dispatch("test", Args::new()).await
        }
    }
}

async fn run_emit(
    cli: &Cli,
    name: String,
    args: Args,
    stop: bool,
    fail: Option<String>,
) -> Result<Outcome<Args>> {
    let quiet = cli.quiet;
    let emitter = emitter(cli);

    emitter.on_any(Listener::infallible(move |event, args: &Args| {
        if !quiet {
            println!("* {} {:?}", event.name(), args);
        }
        if stop {
            event.stop_propagation();
        }
    }));
    emitter.on(
        &name,
        Listener::sync(move |event, args: &Args| {
            if !quiet {
                println!("{} {}", event.name(), args.join(" "));
            }
            match &fail {
                Some(message) => Err(message.clone().into()),
                None => Ok(()),
            }
        }),
    )?;

    let event: Event<Args> = if stop {
        Event::stoppable(name)
    } else {
        Event::new(name)
    };
    emitter.dispatch(event, args).await
}

#[tokio::main]
async fn main() {
    if let Err(e) = run_main().await {
        log::error!("{}", e.user_message());
        std::process::exit(1);
    }
}

/// Initialize logging based on verbosity level.
///
/// From `-vv` on, each line also names the library module that logged it
/// (`emitter` or `dispatch`).
fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let show_module = verbose >= 2;

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format(move |buf, record| {
            use std::io::Write;
            let level = level_tag(record.level());
            let module = module_tag(record.module_path()).filter(|_| show_module);

            match module {
                Some(module) => writeln!(buf, "[{level}] {} {}", module.bright_black(), record.args()),
                None => writeln!(buf, "[{level}] {}", record.args()),
            }
        })
        .init();
}

fn level_tag(level: log::Level) -> colored::ColoredString {
    match level {
        log::Level::Error => "ERROR".red().bold(),
        log::Level::Warn => "WARN".yellow(),
        log::Level::Info => "INFO".green(),
        log::Level::Debug => "DEBUG".cyan(),
        log::Level::Trace => "TRACE".magenta(),
    }
}

/// Library module of a log record, without the crate prefix
fn module_tag(path: Option<&str>) -> Option<&str> {
    path.and_then(|path| path.strip_prefix("chainemit::"))
}

async fn run_main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    info!("chainemit starting with verbosity level: {}", cli.verbose);

    let reporter = Reporter::new(cli.format.clone());

    match &cli.command {
        Commands::Demo {
            scenarios,
            delay_ms,
        } => {
            let selected: Vec<Scenario> = if scenarios.is_empty() {
                Scenario::ALL.to_vec()
            } else {
                scenarios.clone()
            };
            let delay = Duration::from_millis(*delay_ms);
            for scenario in selected {
                let outcome = run_scenario(&cli, scenario, delay).await?;
                reporter.outcome(&outcome);
            }
        }
        Commands::Emit {
            name,
            args,
            stop,
            fail,
        } => {
            let outcome = run_emit(&cli, name.clone(), args.clone(), *stop, fail.clone()).await?;
            reporter.outcome(&outcome);
        }
    }

    Ok(())
}
