//! Chef Eva from the terminal: chat, recipes, menus and quota.
//!
//! Reads the API key from the `OPENROUTER_KEY` environment variable.
//!
//! # Examples
//!
//! ```sh
//! # Interactive chat (type /help inside)
//! chefeva chat --language Español
//!
//! # One recipe from what's in the fridge
//! chefeva recipe leeks potatoes cream --servings 4
//!
//! # A menu for an event
//! chefeva menu --event "birthday dinner" --guests 8 --course starter --course main --course dessert
//!
//! # Messages left
//! chefeva quota
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use chefeva::prelude::*;
use chefeva::quota::DEFAULT_MAX_QUOTA;
use chefeva::recipe::Course;
use chefeva::{API_KEY_ENV, DEFAULT_MODEL};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Chef Eva recipe, menu and chat assistant.
#[derive(Parser)]
#[command(name = "chefeva", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct CommonArgs {
    /// Model to use for completions.
    #[arg(long, global = true, default_value = DEFAULT_MODEL)]
    model: String,

    /// Reply language (English, Español, Français, Deutsch, Italiano).
    #[arg(long, global = true, default_value = "English")]
    language: String,

    /// File holding the persisted message quota.
    #[arg(long, global = true, default_value = ".chefeva/quota.json")]
    quota_file: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Chat with Chef Eva.
    Chat {
        /// Token budget for conversation history.
        #[arg(long, default_value_t = chefeva::context::DEFAULT_CONTEXT_BUDGET)]
        context_budget: usize,
    },
    /// Generate a recipe from ingredients.
    Recipe {
        /// Ingredients you have.
        #[arg(required = true)]
        ingredients: Vec<String>,
        #[arg(long)]
        servings: Option<u32>,
        #[arg(long)]
        cuisine: Option<String>,
        /// Dietary restriction (repeatable).
        #[arg(long = "diet")]
        diets: Vec<String>,
        /// Maximum total time in minutes.
        #[arg(long)]
        max_minutes: Option<u32>,
        /// Print the raw JSON instead of formatted text.
        #[arg(long)]
        json: bool,
    },
    /// Plan a multi-course menu for an event.
    Menu {
        #[arg(long)]
        event: String,
        #[arg(long)]
        guests: u32,
        /// Course name, in serving order (repeatable).
        #[arg(long = "course")]
        courses: Vec<String>,
        #[arg(long)]
        cuisine: Option<String>,
        #[arg(long = "diet")]
        diets: Vec<String>,
        #[arg(long)]
        budget: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show how many chat messages are left.
    Quota,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let result = match cli.command {
        Command::Chat { context_budget } => run_chat(&cli.common, context_budget).await,
        Command::Recipe {
            ingredients,
            servings,
            cuisine,
            diets,
            max_minutes,
            json,
        } => {
            let request = RecipeRequest {
                ingredients,
                cuisine,
                servings,
                dietary_restrictions: diets,
                max_minutes,
                language: Some(cli.common.language.clone()),
            };
            run_recipe(&cli.common, request, json).await
        }
        Command::Menu {
            event,
            guests,
            courses,
            cuisine,
            diets,
            budget,
            json,
        } => {
            let request = MenuRequest {
                event_type: event,
                guests,
                courses,
                cuisine,
                dietary_restrictions: diets,
                budget,
                language: Some(cli.common.language.clone()),
            };
            run_menu(&cli.common, request, json).await
        }
        Command::Quota => {
            show_quota(&cli.common);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn backend(common: &CommonArgs) -> Result<OpenRouterBackend, String> {
    let api_key =
        std::env::var(API_KEY_ENV).map_err(|_| format!("{API_KEY_ENV} environment variable is not set"))?;
    let client = OpenRouterClient::new(api_key)?;
    Ok(OpenRouterBackend::new(client).with_model(&common.model))
}

fn quota_store(common: &CommonArgs) -> Arc<dyn QuotaStore> {
    Arc::new(FileQuotaStore::new(&common.quota_file))
}

// ── chat ───────────────────────────────────────────────────────────

const HELP: &str = "\
Commands:
  /image <url> [text]  attach a photo (with an optional message)
  /lang <language>     switch language
  /reset               start a new conversation
  /quota               show messages left
  /quit                leave";

async fn run_chat(common: &CommonArgs, context_budget: usize) -> Result<(), String> {
    let backend = backend(common)?;
    let config = ChatConfig::default()
        .with_language(&common.language)
        .with_context_budget(context_budget);
    let mut session =
        ChatSession::open(config, quota_store(common)).with_event_handler(Box::new(LoggingHandler));

    print_last_turn(&session);
    println!("({} message(s) left, /help for commands)", session.quota_remaining());

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush().map_err(|e| e.to_string())?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.map_err(|e| format!("failed to read input: {e}"))?;
        let line = line.trim();

        let parts = match line.split_once(' ').unwrap_or((line, "")) {
            ("/quit" | "/exit", _) => break,
            ("/help", _) => {
                println!("{HELP}");
                continue;
            }
            ("/reset", _) => {
                session.reset();
                print_last_turn(&session);
                continue;
            }
            ("/quota", _) => {
                println!("{} message(s) left", session.quota_remaining());
                continue;
            }
            ("/lang", language) if !language.trim().is_empty() => {
                session.set_language(language.trim());
                println!("Language: {}", session.language());
                continue;
            }
            ("/image", rest) => {
                let (url, text) = rest.trim().split_once(' ').unwrap_or((rest.trim(), ""));
                let mut parts = Vec::new();
                if !text.trim().is_empty() {
                    parts.push(Part::text(text.trim()));
                }
                parts.push(Part::media(url, None));
                parts
            }
            _ => vec![Part::text(line)],
        };

        let outcome = session.send(&backend, parts).await;
        println!("\n{}\n", outcome.message());
        if matches!(outcome, SendOutcome::QuotaExhausted { .. }) {
            break;
        }
    }
    Ok(())
}

fn print_last_turn(session: &ChatSession) {
    if let Some(turn) = session.conversation().last() {
        println!("{}", turn.text());
    }
}

// ── recipe / menu ──────────────────────────────────────────────────

async fn run_recipe(common: &CommonArgs, request: RecipeRequest, json: bool) -> Result<(), String> {
    let backend = backend(common)?;
    let recipe = RecipeGenerator::default()
        .generate_recipe(&backend, &request)
        .await
        .map_err(|e| e.localized(Localizer::builtin(), &common.language))?;
    if json {
        print_json(&recipe)
    } else {
        println!("{}", format_recipe(&recipe));
        Ok(())
    }
}

async fn run_menu(common: &CommonArgs, request: MenuRequest, json: bool) -> Result<(), String> {
    let backend = backend(common)?;
    let menu = RecipeGenerator::default()
        .generate_menu(&backend, &request)
        .await
        .map_err(|e| e.localized(Localizer::builtin(), &common.language))?;
    if json {
        print_json(&menu)
    } else {
        println!("{}", format_menu(&menu));
        Ok(())
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}

fn format_recipe(recipe: &Recipe) -> String {
    let mut out = format!(
        "{}\n{}\n\nServes {} | prep {} min | cook {} min\n\nIngredients:\n",
        recipe.title, recipe.description, recipe.servings, recipe.prep_minutes, recipe.cook_minutes
    );
    for ingredient in &recipe.ingredients {
        out.push_str(&format!("  - {} {}\n", ingredient.quantity, ingredient.name));
    }
    out.push_str("\nSteps:\n");
    for (i, step) in recipe.steps.iter().enumerate() {
        out.push_str(&format!("  {}. {step}\n", i + 1));
    }
    if !recipe.tips.is_empty() {
        out.push_str("\nTips:\n");
        for tip in &recipe.tips {
            out.push_str(&format!("  * {tip}\n"));
        }
    }
    out
}

fn format_menu(menu: &Menu) -> String {
    let mut out = format!("{}\n{}\n", menu.title, menu.description);
    for Course {
        course,
        name,
        description,
        key_ingredients,
    } in &menu.courses
    {
        out.push_str(&format!("\n[{course}] {name}\n  {description}\n"));
        if !key_ingredients.is_empty() {
            out.push_str(&format!("  ({})\n", key_ingredients.join(", ")));
        }
    }
    for note in &menu.notes {
        out.push_str(&format!("\n* {note}"));
    }
    out
}

// ── quota ──────────────────────────────────────────────────────────

fn show_quota(common: &CommonArgs) {
    let tracker = QuotaTracker::load(
        quota_store(common),
        chefeva::quota::DEFAULT_QUOTA_KEY,
        DEFAULT_MAX_QUOTA,
    );
    let catalog = Localizer::builtin().catalog(&common.language);
    match tracker.state() {
        QuotaState::Available => println!("{}/{} message(s) left", tracker.remaining(), tracker.max()),
        QuotaState::Exhausted => println!("{}", catalog.quota_exhausted),
    }
}
