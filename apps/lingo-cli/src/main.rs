//! lingo - spaced-repetition vocabulary review and metered-call quotas.

mod app;
mod config;

use app::{Action, App, JsonLinesSink};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use config::Config;
use lingo_recall::{RecallItem, RecallScheduler};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lingo", about = "Vocabulary recall review and call quotas", version)]
struct Cli {
    /// Exam whose recall items to use (overrides config)
    #[arg(long, global = true)]
    exam: Option<String>,

    /// Language whose recall items to use (overrides config)
    #[arg(long, global = true)]
    language: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Hourly and daily call quotas
    #[command(subcommand)]
    Quota(QuotaCommand),

    /// Spaced-repetition recall items
    #[command(subcommand)]
    Recall(RecallCommand),

    /// Per-day usage counters
    #[command(subcommand)]
    Stats(StatsCommand),

    /// Configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum QuotaCommand {
    /// Check whether a call may be made now
    Check {
        #[arg(value_enum, default_value = "ai")]
        action: Action,
    },
    /// Count a call
    Record {
        #[arg(value_enum, default_value = "ai")]
        action: Action,
    },
    /// Clear all counters
    Reset {
        #[arg(value_enum, default_value = "ai")]
        action: Action,
    },
    /// Show counters and remaining calls
    Status {
        #[arg(value_enum, default_value = "ai")]
        action: Action,
    },
}

#[derive(Subcommand)]
enum RecallCommand {
    /// Start tracking a word
    Add {
        key: String,
        /// Display text (defaults to the key)
        #[arg(long)]
        text: Option<String>,
        /// Image identifier
        #[arg(long, default_value = "")]
        image: String,
        /// Extra display text
        #[arg(long, default_value = "")]
        extra: String,
    },
    /// Begin studying a word
    Study { key: String },
    /// The word has been learnt
    Memorised { key: String },
    /// Show a due word and wait for the answer
    Ask { key: String },
    /// The word was recalled correctly
    Ok { key: String },
    /// The word was not recalled
    Fail { key: String },
    /// Retire a word from review
    Done { key: String },
    /// Track a word and review it in ten minutes
    Focus { word: String },
    /// Stop tracking a word
    Remove { key: String },
    /// Stop tracking every word for this exam and language
    Clear,
    /// List all tracked words
    List,
    /// List words that are due now
    Due,
}

#[derive(Subcommand)]
enum StatsCommand {
    /// Show today's counters and closed days waiting to be flushed
    Show,
    /// Append closed days to a JSON Lines file and forget them
    Flush { out: PathBuf },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write the effective configuration to the config file
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load();
    if let Some(exam) = cli.exam {
        config.recall.exam = exam;
    }
    if let Some(language) = cli.language {
        config.recall.language = language;
    }

    match cli.command {
        Command::Config(command) => run_config(command, &config),
        Command::Quota(command) => {
            let app = App::new(config)?;
            run_quota(command, &app);
            Ok(())
        }
        Command::Stats(command) => {
            let app = App::new(config)?;
            run_stats(command, &app)
        }
        Command::Recall(command) => {
            let app = App::new(config)?;
            let result = run_recall(command, &app);
            app.flush().await;
            result
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn run_config(command: ConfigCommand, config: &Config) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Show => {
            print!("{}", toml::to_string_pretty(config)?);
        }
        ConfigCommand::Init => {
            config.save()?;
            match Config::config_path() {
                Some(path) => println!("Wrote {}", path.display()),
                None => println!("No config directory available"),
            }
        }
    }
    Ok(())
}

fn run_quota(command: QuotaCommand, app: &App) {
    match command {
        QuotaCommand::Check { action } => {
            let decision = app.quota(action).can_make_call();
            if decision.allowed {
                println!("{}: allowed", action.name());
            } else {
                let reason = decision.fail_reason.map(|r| r.name()).unwrap_or("unknown");
                match decision.wait_seconds {
                    Some(wait) => println!(
                        "{}: {} limit reached, wait {}",
                        action.name(),
                        reason,
                        format_wait(wait)
                    ),
                    None => println!("{}: {} limit reached", action.name(), reason),
                }
            }
        }
        QuotaCommand::Record { action } => {
            app.quota(action).record_call();
            app.usage().increment(action.name());
            let usage = app.quota(action).usage();
            println!(
                "{}: {} this hour, {} today",
                action.name(),
                usage.hourly_count,
                usage.daily_count
            );
        }
        QuotaCommand::Reset { action } => {
            app.quota(action).reset_rate_limits();
            println!("{}: counters cleared", action.name());
        }
        QuotaCommand::Status { action } => {
            let quota = app.quota(action);
            let limits = quota.limits();
            let usage = quota.usage();
            println!("{} ({})", action.name(), if limits.enabled { "enabled" } else { "disabled" });
            println!(
                "  hourly: {}/{} ({} left)",
                usage.hourly_count, limits.hourly_limit, usage.hourly_remaining
            );
            println!(
                "  daily:  {}/{} ({} left)",
                usage.daily_count, limits.daily_limit, usage.daily_remaining
            );
        }
    }
}

fn run_stats(command: StatsCommand, app: &App) -> anyhow::Result<()> {
    let usage = app.usage();
    match command {
        StatsCommand::Show => {
            println!("Today:");
            for (name, count) in usage.today() {
                println!("  {:<12} {}", name, count);
            }
            let pending = usage.pending();
            println!("Pending days: {}", pending.len());
            for bucket in pending {
                println!("  {}  {} calls", bucket.day, bucket.total());
            }
        }
        StatsCommand::Flush { out } => {
            let mut sink = JsonLinesSink::create(&out)?;
            let flushed = usage.flush(&mut sink);
            println!("Flushed {} day(s) to {}", flushed, out.display());
        }
    }
    Ok(())
}

fn run_recall(command: RecallCommand, app: &App) -> anyhow::Result<()> {
    let mut scheduler = app.scheduler();

    match command {
        RecallCommand::Add { key, text, image, extra } => {
            let text = text.unwrap_or_else(|| key.clone());
            if scheduler.add(&key, text, image, extra) {
                println!("Tracking {}", key);
            } else {
                println!("{} is already tracked", key);
            }
        }
        RecallCommand::Study { key } => {
            let found = scheduler.start_memorising(&key)?;
            report(&scheduler, &key, found)
        }
        RecallCommand::Memorised { key } => {
            let found = scheduler.i_have_memorised_it(&key)?;
            report(&scheduler, &key, found)
        }
        RecallCommand::Ask { key } => {
            let found = scheduler.await_answer(&key)?;
            report(&scheduler, &key, found)
        }
        RecallCommand::Ok { key } => {
            let found = scheduler.recalled_ok(&key)?;
            report(&scheduler, &key, found)
        }
        RecallCommand::Fail { key } => {
            let found = scheduler.recalled_not_ok(&key)?;
            report(&scheduler, &key, found)
        }
        RecallCommand::Done { key } => {
            let found = scheduler.mark_done(&key)?;
            report(&scheduler, &key, found)
        }
        RecallCommand::Focus { word } => {
            scheduler.focus_on_word(&word)?;
            report(&scheduler, &word, true)
        }
        RecallCommand::Remove { key } => {
            if scheduler.remove(&key) {
                println!("Removed {}", key);
            } else {
                println!("{} is not tracked", key);
            }
        }
        RecallCommand::Clear => {
            let count = scheduler.len();
            scheduler.remove_all();
            println!("Removed {} item(s) from {}", count, scheduler.storage_key());
        }
        RecallCommand::List => print_items(&scheduler, scheduler.items().iter()),
        RecallCommand::Due => {
            let due = scheduler.due_items();
            if due.is_empty() {
                match scheduler.next_due() {
                    Some(next) => println!(
                        "Nothing due. Next: {} at {}",
                        next.key,
                        local(next.next_event_time)
                    ),
                    None => println!("Nothing scheduled"),
                }
            } else {
                print_items(&scheduler, due.into_iter());
            }
        }
    }

    Ok(())
}

fn report(scheduler: &RecallScheduler, key: &str, found: bool) {
    match scheduler.get(key).filter(|_| found) {
        Some(item) => println!(
            "{}: {} (stop {} {}), next {}",
            item.key,
            item.recall_state.name(),
            item.current_stop_number,
            scheduler.stops().code_for(item.current_stop_number),
            local(item.next_event_time)
        ),
        None => println!("{} is not tracked", key),
    }
}

fn print_items<'a>(scheduler: &RecallScheduler, items: impl Iterator<Item = &'a RecallItem>) {
    let mut count = 0;
    for item in items {
        count += 1;
        println!(
            "{:<16} {:<20} stop {:>2} ({:>3})  next {}",
            item.key,
            item.recall_state.name(),
            item.current_stop_number,
            scheduler.stops().code_for(item.current_stop_number),
            local(item.next_event_time)
        );
    }
    if count == 0 {
        println!("No items under {}", scheduler.storage_key());
    }
}

fn local(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn format_wait(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_recall_add() {
        let cli = Cli::try_parse_from([
            "lingo", "--exam", "dele", "recall", "add", "gato", "--text", "cat",
        ])
        .unwrap();
        assert_eq!(cli.exam.as_deref(), Some("dele"));
        match cli.command {
            Command::Recall(RecallCommand::Add { key, text, .. }) => {
                assert_eq!(key, "gato");
                assert_eq!(text.as_deref(), Some("cat"));
            }
            _ => panic!("expected recall add"),
        }
    }

    #[test]
    fn test_format_wait() {
        assert_eq!(format_wait(30), "30s");
        assert_eq!(format_wait(45 * 60), "45m");
        assert_eq!(format_wait(14 * 3600 + 120), "14h 2m");
    }
}
