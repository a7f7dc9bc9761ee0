//! freeroute CLI binary: ask free OpenRouter models and manage the ranked model cache.
//!
//! Subcommands: `ask` (one waterfall completion), `models` (print the ranked list),
//! `refresh` (force a catalog refetch), `daemon` (refresh on a schedule until Ctrl-C).

mod log_format;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use cli::{run_ask, run_daemon, run_models, run_refresh, AskOptions, CliError};
use freeroute::{TracingOutcomeSink, Waterfall, DAILY_REFRESH};

#[derive(Parser, Debug)]
#[command(name = "freeroute")]
#[command(about = "freeroute: chat completions across ranked free OpenRouter models")]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Send one message through the model waterfall and print the reply
    Ask(AskArgs),
    /// Print the ranked free model list (cached for 24h)
    Models(ModelsArgs),
    /// Refetch the catalog and rewrite the cache file
    Refresh,
    /// Refresh the model cache on a schedule until interrupted
    Daemon(DaemonArgs),
}

#[derive(clap::Args, Debug, Clone)]
struct AskArgs {
    /// User message (or pass as positional words)
    #[arg(short, long, value_name = "TEXT")]
    message: Option<String>,

    #[arg(trailing_var_arg = true)]
    rest: Vec<String>,

    /// System prompt sent before the user message
    #[arg(short, long, value_name = "TEXT")]
    system: Option<String>,

    /// Overrides FREEROUTE_MAX_TOKENS
    #[arg(long, value_name = "N")]
    max_tokens: Option<u32>,

    /// Overrides FREEROUTE_TEMPERATURE
    #[arg(long, value_name = "T")]
    temperature: Option<f32>,

    /// Print `{"model", "text"}` as one JSON line
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug, Clone)]
struct ModelsArgs {
    /// Ignore the cache and refetch
    #[arg(long)]
    refresh: bool,

    /// Print a JSON array
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug, Clone)]
struct DaemonArgs {
    /// Seconds between refreshes (default: one day)
    #[arg(long, value_name = "SECS")]
    interval_secs: Option<u64>,
}

impl AskArgs {
    fn into_options(self) -> Option<AskOptions> {
        let message = self.message.or_else(|| {
            if self.rest.is_empty() {
                None
            } else {
                Some(self.rest.join(" "))
            }
        })?;
        Some(AskOptions {
            message,
            system: self.system,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            json: self.json,
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let loaded = config::load_and_apply("freeroute", None::<&std::path::Path>);
    let log_guard = match logging::init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("freeroute: logging: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = loaded {
        tracing::warn!(error = %e, "config files not applied");
    }

    let args = Args::parse();
    let settings = config::Settings::from_env();
    if !settings.has_credential() {
        tracing::warn!("{} is not set; catalog and completion calls will fail", config::ENV_API_KEY);
    }
    let waterfall = Waterfall::from_settings(&settings).with_outcome_sink(Arc::new(TracingOutcomeSink));
    let mut stdout = std::io::stdout();

    let result: Result<(), CliError> = match args.cmd {
        Command::Ask(ask) => {
            let Some(opts) = ask.into_options() else {
                eprintln!("freeroute: provide a message via -m/--message or positional args");
                return ExitCode::from(2);
            };
            run_ask(&waterfall, &opts, &mut stdout).await
        }
        Command::Models(m) => run_models(waterfall.cache(), m.refresh, m.json, &mut stdout).await,
        Command::Refresh => run_refresh(waterfall.cache(), &mut stdout).await,
        Command::Daemon(d) => {
            let interval = d
                .interval_secs
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(DAILY_REFRESH);
            run_daemon(waterfall.cache().clone(), interval, async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
        }
    };

    let code = exit_code(&result);
    // Flushes buffered file logs before the process ends.
    drop(log_guard);
    if let Err(e) = result {
        eprintln!("freeroute: {}", e);
    }
    ExitCode::from(code)
}

fn exit_code(result: &Result<(), CliError>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}
