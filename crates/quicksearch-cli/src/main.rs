//! quicksearch CLI: terminal driver for the shopping assistant widget

mod render;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use quicksearch_engine::{
    catalog_for, CatalogError, Category, Collected, ConfigError, EngineConfig, EngineError, Flow,
    Message, MessageId, ProductSource, Resolution, UnknownCategory, View, Widget, WidgetError,
};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::render::{render_log, render_message, render_products};

/// Mock AI shopping assistant in the terminal
#[derive(Parser)]
#[command(name = "quicksearch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: .quicksearch/config.json if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Conversation flow: scripted or guided-intake
    #[arg(long, global = true)]
    flow: Option<Flow>,

    /// Override the simulated thinking delay
    #[arg(long, global = true)]
    delay_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat interactively (default when no command specified)
    Chat,

    /// Play a file of queries and commands, then print the transcript
    Replay {
        /// File with one query or /command per line
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the product catalog
    Catalog {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default .quicksearch/config.json
    Init,
}

const QUICKSEARCH_DIR: &str = ".quicksearch";

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref(), cli.flow, cli.delay_ms) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };

    let result = match cli.command {
        None | Some(Commands::Chat) => with_runtime(run_chat(config)),
        Some(Commands::Replay { file, json }) => with_runtime(run_replay(config, file, json)),
        Some(Commands::Catalog { json }) => cmd_catalog(&config, json),
        Some(Commands::Init) => cmd_init(&config),
    };

    if let Err(e) = result {
        fail(&e);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quicksearch=info,quicksearch_engine=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fail(e: &CliError) -> ! {
    eprintln!("Error: {e}");
    std::process::exit(1);
}

fn with_runtime(fut: impl std::future::Future<Output = Result<(), CliError>>) -> Result<(), CliError> {
    let rt = tokio::runtime::Runtime::new().map_err(CliError::Io)?;
    rt.block_on(fut)
}

fn load_config(
    path: Option<&Path>,
    flow: Option<Flow>,
    delay_ms: Option<u64>,
) -> Result<EngineConfig, CliError> {
    let default_path = Path::new(QUICKSEARCH_DIR).join("config.json");
    let mut config = match path {
        Some(path) => EngineConfig::load(path)?,
        None if default_path.exists() => EngineConfig::load(&default_path)?,
        None => EngineConfig::default(),
    };
    if let Some(flow) = flow {
        config.flow = flow;
    }
    if let Some(delay_ms) = delay_ms {
        config.delay_ms = delay_ms;
    }
    debug!(flow = %config.flow, delay_ms = config.delay_ms, "Loaded config");
    Ok(config)
}

fn cmd_catalog(config: &EngineConfig, json: bool) -> Result<(), CliError> {
    let products = catalog_for(config)?.products();

    if json {
        println!("{}", serde_json::to_string_pretty(&products)?);
        return Ok(());
    }

    println!("Catalog\n");
    print!("{}", render_products(&products));
    println!("\n{} product(s)", products.len());
    Ok(())
}

fn cmd_init(config: &EngineConfig) -> Result<(), CliError> {
    let config_path = Path::new(QUICKSEARCH_DIR).join("config.json");
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }
    config.save(&config_path)?;
    println!("Created {}", config_path.display());
    Ok(())
}

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Query(String),
    Chips,
    Pick(String),
    Sub(String),
    More(MessageId),
    Action { message: MessageId, label: String },
    Cart(String),
    Back,
    Reset,
    Help,
    Quit,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return Input::Query(line.to_string());
    };
    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, rest)| (name, rest.trim()));

    match name {
        "chips" => Input::Chips,
        "pick" => Input::Pick(rest.to_string()),
        "sub" => Input::Sub(rest.to_string()),
        "more" => Input::More(MessageId::from(rest)),
        "action" => {
            let (id, label) = rest
                .split_once(char::is_whitespace)
                .map_or((rest, ""), |(id, label)| (id, label.trim()));
            Input::Action {
                message: MessageId::from(id),
                label: label.to_string(),
            }
        }
        "cart" => Input::Cart(rest.to_string()),
        "back" => Input::Back,
        "reset" => Input::Reset,
        "help" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => Input::Unknown(other.to_string()),
    }
}

const HELP: &str = "\
Type a question, or one of:
  /chips                  list topics
  /pick <topic>           pick a topic
  /sub <label>            pick a follow-up chip
  /more <message-id>      show more products
  /action <id> <label>    pick a recommendation chip
  /cart <product>         add a product to the cart
  /back  /reset  /quit";

/// What the driver should do after handling a line.
enum Step {
    Continue,
    Pending(Resolution),
    Stop,
}

/// Apply one line of input to the widget, printing immediate feedback.
fn handle(widget: &mut Widget, input: Input) -> Result<Step, CliError> {
    match input {
        Input::Query(text) => {
            if widget.view() == View::Explain {
                widget.continue_to_chips()?;
            }
            Ok(Step::Pending(widget.send(&text)?))
        }
        Input::Chips => {
            print_chips();
            Ok(Step::Continue)
        }
        Input::Pick(label) => {
            let category: Category = label.parse()?;
            widget.pick_category(category)?;
            if let Some(subs) = widget.subcategories() {
                println!("  {}", subs.join(" | "));
            }
            Ok(Step::Continue)
        }
        Input::Sub(label) => Ok(Step::Pending(widget.pick_subcategory(&label)?)),
        Input::More(id) => {
            let revealed = widget.engine()?.show_more(&id)?;
            print!("{}", render_products(&revealed));
            Ok(Step::Continue)
        }
        Input::Action { message, label } => {
            widget.select_action(&message, &label)?;
            Ok(Step::Continue)
        }
        Input::Cart(title) => {
            let count = widget.add_to_cart(&title);
            println!("  Cart: {count}");
            Ok(Step::Continue)
        }
        Input::Back => {
            widget.back();
            if widget.is_open() {
                print_chips();
                Ok(Step::Continue)
            } else {
                Ok(Step::Stop)
            }
        }
        Input::Reset => {
            widget.engine()?.reset();
            Ok(Step::Continue)
        }
        Input::Help => {
            println!("{HELP}");
            Ok(Step::Continue)
        }
        Input::Quit => Ok(Step::Stop),
        Input::Unknown(name) => {
            println!("  Unknown command /{name}, try /help");
            Ok(Step::Continue)
        }
    }
}

fn print_chips() {
    let labels: Vec<&str> = Category::CHIPS.iter().map(|c| c.label()).collect();
    println!("  {}", labels.join(" | "));
}

fn open_widget(config: EngineConfig) -> Result<Widget, CliError> {
    let catalog: Arc<dyn ProductSource> = catalog_for(&config)?;
    let mut widget =
        Widget::new(config, catalog).on_action(|value| println!("  (picked {value})"));
    widget.open();
    Ok(widget)
}

async fn run_chat(config: EngineConfig) -> Result<(), CliError> {
    let mut widget = open_widget(config)?;
    println!("{}", widget.title());
    println!("Pick a topic with /pick, or just ask. /help lists commands.");
    widget.continue_to_chips()?;
    print_chips();

    let mut rx = widget.engine()?.subscribe();
    let printer = tokio::spawn(async move {
        let mut seen = HashSet::new();
        while rx.changed().await.is_ok() {
            let log = rx.borrow_and_update().clone();
            for message in log.iter().filter(|m| seen.insert(m.id.clone())) {
                print!("{}", render_message(message));
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match handle(&mut widget, parse_input(&line)) {
            Ok(Step::Stop) => break,
            Ok(Step::Continue | Step::Pending(_)) => {}
            Err(e) => println!("  {e}"),
        }
    }

    widget.close();
    printer.abort();
    Ok(())
}

/// Transcript printed by `replay --json`.
#[derive(Serialize)]
struct Transcript {
    messages: Vec<Message>,
    collected: Collected,
    cart_count: u32,
}

async fn run_replay(config: EngineConfig, file: PathBuf, json: bool) -> Result<(), CliError> {
    let script = tokio::fs::read_to_string(&file).await?;
    let mut widget = open_widget(config)?;
    widget.continue_to_chips()?;

    for line in script.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match handle(&mut widget, parse_input(line)) {
            Ok(Step::Pending(resolution)) => {
                resolution.finished().await;
            }
            Ok(Step::Continue) => {}
            Ok(Step::Stop) => break,
            Err(e) => eprintln!("  {line}: {e}"),
        }
    }

    let Ok(engine) = widget.engine() else {
        return Ok(());
    };
    let messages = engine.messages();
    if json {
        let transcript = Transcript {
            messages,
            collected: engine.collected(),
            cart_count: widget.cart_count(),
        };
        println!("{}", serde_json::to_string_pretty(&transcript)?);
    } else {
        print!("{}", render_log(&messages));
    }
    Ok(())
}

/// Errors surfaced by the CLI.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Widget(#[from] WidgetError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Category(#[from] UnknownCategory),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
