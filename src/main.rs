mod demo;

use clap::{Parser, Subcommand};
use demo::{DroppedItems, Inventory, ItemStack, Player};
use savekit::save::codec::value_types::Vec2Int;
use savekit::save::{LoadOutcome, SaveManager, SaveSettings, entity_handle};
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "savekit", about = "Save/load demo with sessions and dependency-ordered loading")]
struct Cli {
    /// Root directory for saves (defaults to the documents folder)
    #[arg(long)]
    root: Option<PathBuf>,

    /// JSON file overriding save settings
    #[arg(long)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Save the demo world under a name
    Save {
        name: String,
        #[arg(long, default_value = "Adventure")]
        session: String,
        /// Move the player before saving
        #[arg(long, num_args = 2, value_names = ["X", "Y"])]
        position: Option<Vec<i32>>,
    },
    /// Save under the next free quicksave name
    QuickSave {
        #[arg(long, default_value = "Adventure")]
        session: String,
    },
    /// Load the latest save of the most recently played session
    QuickLoad,
    /// Load the latest save of a session
    Load { session: String },
    /// List sessions, newest first
    List,
    /// Delete one save of a session
    Delete { session: String, file_name: String },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut settings = match &cli.settings {
        Some(path) => SaveSettings::from_json_file(path)?,
        None => SaveSettings::default(),
    };
    if let Some(root) = cli.root {
        settings.root_dir = root;
    }

    let mut saves = SaveManager::open(settings)?;

    // Demo world
    let player = entity_handle(Player::default());
    let inventory = entity_handle(Inventory::new(player.clone()));
    let dropped = entity_handle(DroppedItems::default());
    inventory.borrow_mut().add("slime_ball", 3);
    dropped.borrow_mut().items.insert(
        Vec2Int::new(4, 2),
        ItemStack {
            item_id: "health_potion".to_string(),
            quantity: 1,
        },
    );
    saves.register_entity(player.clone())?;
    saves.register_entity(inventory.clone())?;
    saves.register_entity(dropped.clone())?;

    match cli.command {
        Command::Save {
            name,
            session,
            position,
        } => {
            if let Some([x, y]) = position.as_deref() {
                player.borrow_mut().position = Vec2Int::new(*x, *y);
            }
            saves.start_session(session);
            let info = saves.save_file(&name)?;
            println!("Saved '{}' at {}", info.file_name, info.date);
        }
        Command::QuickSave { session } => {
            saves.start_session(session);
            let info = saves.quick_save()?;
            println!("Saved '{}' at {}", info.file_name, info.date);
        }
        Command::QuickLoad => {
            if saves.quick_load().is_none() {
                println!("No supported save to load");
                return Ok(());
            }
            report_load(saves.on_context_enter()?, &player.borrow());
        }
        Command::Load { session } => {
            if saves.load_game_session(&session).is_none() {
                println!("No session named '{}'", session);
                return Ok(());
            }
            report_load(saves.on_context_enter()?, &player.borrow());
        }
        Command::List => {
            for session in saves.list_sessions() {
                let last_played = session
                    .last_played()
                    .map(|date| date.to_string())
                    .unwrap_or_default();
                let support = if session.is_supported() { "" } else { " (unsupported)" };
                println!(
                    "{}  v{}  last played {}{}",
                    session.display_name(),
                    session.game_version(),
                    last_played,
                    support
                );
                for save in session.saves() {
                    println!("    {}  {}", save.file_name, save.date);
                }
            }
        }
        Command::Delete { session, file_name } => {
            let save = saves
                .find_session(&session)
                .and_then(|s| s.saves().iter().find(|save| save.file_name == file_name))
                .cloned();
            match save {
                Some(save) => {
                    saves.delete_save(&save)?;
                    println!("Deleted '{}'", file_name);
                }
                None => println!("No save '{}' in session '{}'", file_name, session),
            }
        }
    }

    Ok(())
}

fn report_load(outcome: LoadOutcome, player: &Player) {
    match outcome {
        LoadOutcome::Completed(report) if report.data_found => {
            println!(
                "Loaded '{}': {} restored, {} without record, {} failed",
                report.file_name,
                report.loaded.len(),
                report.without_record.len(),
                report.failed.len()
            );
            println!(
                "Player '{}' at ({}, {}), level {}",
                player.name, player.position.x, player.position.y, player.level
            );
        }
        LoadOutcome::Completed(report) => println!("Data file for '{}' is missing", report.file_name),
        LoadOutcome::Cancelled => println!("Load cancelled"),
        LoadOutcome::Idle => println!("Nothing to load"),
    }
}
