use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use spaced_out_lib::category::{available_categories, due_count};
use spaced_out_lib::commands::HELP;
use spaced_out_lib::config::parse_log_level;
use spaced_out_lib::groups::{mark_default, resolve_group_cards, save_group_draft, set_all_groups_due_now, unmark_default};
use spaced_out_lib::scheduling::DEFAULT_DAY_RATING;
use spaced_out_lib::{
    add_to_default_group, build_batch, inverse_practice, Card, CardStore, CardView, Category, Config, DueFilter, DuePolicy,
    GroupDraft, JsonStore, RateOutcome, RatingChoices, ReviewCommand, ReviewSession, StoreError,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "spaced-out", version, about = "Spaced repetition flashcards in the terminal")]
struct Cli {
    /// Directory holding cards.json, groups.json and settings.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// error, warn, info, debug or trace
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Review the cards of one category
    Review {
        #[arg(long, default_value = "EN to NL")]
        category: Category,
        /// Only cards whose due time has passed
        #[arg(long)]
        due_only: bool,
        /// Start on this card if it is in the batch
        #[arg(long)]
        card: Option<String>,
    },
    /// Practice EN to NL cards the other way round, shuffled
    Inverse,
    /// Review the cards of a group
    Study { group: String },
    /// Add a card
    Add {
        #[arg(long, default_value = "EN to NL")]
        category: Category,
        #[arg(required = true, num_args = 2..=10)]
        sides: Vec<String>,
    },
    /// Show due counts per category
    Stats,
    /// List groups; the default group is starred
    Groups,
    /// Create a group from the never-rated and retry cards
    NewGroup {
        #[arg(long)]
        name: Option<String>,
        /// Leave these cards out; the next candidate takes their place
        #[arg(long = "without")]
        without: Vec<String>,
        /// Select these candidates as well
        #[arg(long = "with")]
        with: Vec<String>,
        /// Make the new group the default
        #[arg(long)]
        default: bool,
    },
    /// Make a group the default target for quick adds
    Default {
        group: String,
        /// Remove the default mark instead
        #[arg(long)]
        unset: bool,
    },
    /// Make every rated card in any group due now
    DueNow,
    /// Write all cards to a JSON file
    Export { path: PathBuf },
    /// Replace all cards with the contents of a JSON file
    Import { path: PathBuf },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> spaced_out_lib::Result<()> {
    let log_level = cli.log_level.as_deref().map(parse_log_level).transpose()?;
    let config = Config::from_env()?.with_data_dir(cli.data_dir).with_log_level(log_level);
    config.init_logging();

    let store = JsonStore::new(&config.data_dir)?;
    let now = Utc::now();

    match cli.command {
        Command::Review { category, due_only, card } => {
            let cards = store.list_cards().await?;
            let filter = if due_only { DueFilter::DueOnly } else { DueFilter::All };
            let (category, batch) = build_batch(&cards, category, filter, now);
            let offered: Vec<String> = available_categories(&cards).iter().map(Category::to_string).collect();
            println!("{} ({} cards, available: {})", category, batch.len(), offered.join(", "));

            let session = ReviewSession::start(batch, card.as_deref(), now);
            review_loop(&store, session).await?;
        }
        Command::Inverse => {
            let cards = store.list_cards().await?;
            let batch = inverse_practice(&cards, &mut rand::rng());
            println!("Cards in batch: {}", batch.len());
            review_loop(&store, ReviewSession::in_batch_order(batch)).await?;
        }
        Command::Study { group } => {
            let group = store
                .get_group(&group)
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("group {}", group)))?;
            let cards = resolve_group_cards(&store, &group).await?;
            println!("{} (due cards: {})", group.name, due_count(&cards, now));
            if cards.is_empty() {
                println!("No cards in this group.");
                return Ok(());
            }

            let batch = cards.iter().map(CardView::of).collect();
            review_loop(&store, ReviewSession::start(batch, None, now)).await?;
        }
        Command::Add { category, sides } => {
            let card = Card::new(sides, Some(category))?;
            store.insert_card(card.clone())?;
            println!("Added card {}", card.id);
        }
        Command::Stats => {
            let cards = store.list_cards().await?;
            let stats = DuePolicy::calculate_stats(&cards, now);
            println!(
                "{} cards: {} due, {} new, {} upcoming",
                stats.total_cards, stats.cards_due, stats.cards_new, stats.cards_upcoming
            );
            for category in DuePolicy::category_stats(&cards, now) {
                println!(
                    "  {:<12} {:>4} total {:>4} due {:>4} new",
                    category.category.label(),
                    category.total_cards,
                    category.cards_due,
                    category.cards_new
                );
            }
        }
        Command::Groups => {
            let settings = store.get_settings().await?;
            for group in store.list_groups().await? {
                let marker = if settings.is_default(&group.id) { "*" } else { " " };
                println!("{} {} ({}) {}", marker, group.name, group.card_ids.len(), group.id);
            }
        }
        Command::NewGroup {
            name,
            without,
            with,
            default,
        } => {
            let cards = store.list_cards().await?;
            let mut draft = GroupDraft::create(&cards);
            for card_id in &without {
                draft.remove(card_id);
            }
            for card_id in &with {
                if !draft.add(card_id) {
                    println!("{} is not a candidate, skipped", card_id);
                }
            }
            if let Some(name) = name {
                draft.rename(name);
            }
            draft.make_default = default;

            let group = save_group_draft(&store, draft, now).await?;
            println!("Created {} with {} cards ({})", group.name, group.card_ids.len(), group.id);
        }
        Command::Default { group, unset } => {
            if unset {
                if !unmark_default(&store, &group).await? {
                    println!("{} was not the default group", group);
                }
            } else {
                mark_default(&store, &group).await?;
            }
        }
        Command::DueNow => {
            let updated = set_all_groups_due_now(&store, now).await?;
            println!("Updated {} cards to be due now.", updated);
        }
        Command::Export { path } => {
            let count = store.export_cards(&path)?;
            println!("Exported {} cards to {}", count, path.display());
        }
        Command::Import { path } => {
            let count = store.import_cards(&path)?;
            println!("Successfully imported {} cards!", count);
        }
    }

    Ok(())
}

fn prompt() -> io::Result<()> {
    print!("> ");
    io::stdout().flush()
}

async fn review_loop(store: &dyn CardStore, mut session: ReviewSession) -> spaced_out_lib::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut revealed = 0;
    let mut custom = DEFAULT_DAY_RATING;

    loop {
        let Some(view) = session.current().cloned() else {
            println!("No due cards in this category!");
            return Ok(());
        };

        if revealed == 0 {
            println!();
            println!("[{}/{}] {}", session.current_index() + 1, session.len(), view.category);
        }
        if let Some(side) = view.sides.get(revealed) {
            println!("  {}", side);
        }
        if revealed > 0 {
            let choices = RatingChoices::for_card(view.rate, custom);
            println!(
                "  rate: {} = 10 min | {} | {} | {} days",
                choices.retry, choices.custom, choices.suggested, choices.stretch
            );
        }
        prompt()?;

        let Some(line) = lines.next() else {
            return Ok(());
        };
        let line = line?;

        match line.parse::<ReviewCommand>() {
            Ok(ReviewCommand::Reveal) => {
                if revealed + 1 < view.sides.len() {
                    revealed += 1;
                }
            }
            Ok(ReviewCommand::Rate(_)) if revealed == 0 => println!("Show the answer first."),
            Ok(ReviewCommand::Rate(rating)) => match session.rate_current(store, rating, Utc::now()).await {
                Ok(RateOutcome::Rated { due_at, .. }) => {
                    if rating > 0 {
                        custom = rating;
                    }
                    println!("  due {}", due_at.with_timezone(&Local).format("%b %-d, %H:%M"));
                    revealed = 0;
                }
                Ok(RateOutcome::Stale) => revealed = 0,
                Err(e) => println!("Could not save the rating, try again: {}", e),
            },
            Ok(ReviewCommand::Skip) => {
                session.skip();
                revealed = 0;
            }
            Ok(ReviewCommand::Move(step)) => {
                session.move_current(step);
                revealed = 0;
            }
            Ok(ReviewCommand::AddToDefaultGroup) => {
                let outcome = add_to_default_group(store, view.id()).await;
                println!("  {}", outcome.message);
            }
            Ok(ReviewCommand::Help) => println!("{}", HELP),
            Ok(ReviewCommand::Quit) => return Ok(()),
            Err(e) => println!("{} (? for help)", e),
        }
    }
}
