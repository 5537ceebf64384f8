//! Boardvault CLI - archive manager and query tool for whiteboard backups.

use boardvault::cli::{
    ArchiveCommands, BoardCommands, CardCommands, Cli, Commands, ConfigCommands, SearchCommands,
};
use boardvault::commands::{self, Output, Session};
use boardvault::config::{self, ConfigOverrides, ResolvedSettings};
use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    init_tracing();

    let overrides = ConfigOverrides {
        config_path: cli.config_path.clone(),
        archive_dir: cli.archive_dir.clone(),
        unpack_dir: cli.unpack_dir.clone(),
    };

    let result = config::resolve_settings(&overrides)
        .and_then(|settings| run_command(cli.command, &settings, cli.archive.as_deref(), human));

    if let Err(e) = result {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

/// Log to stderr so stdout stays reserved for command output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_command(
    command: Commands,
    settings: &ResolvedSettings,
    archive: Option<&str>,
    human: bool,
) -> Result<(), boardvault::Error> {
    match command {
        Commands::Archive { command } => match command {
            ArchiveCommands::List { sort, limit, dir } => {
                let result = commands::archive_list(settings, &sort, limit, dir.as_deref())?;
                output(&result, human);
            }
            ArchiveCommands::Load {
                path,
                id,
                no_unpack,
            } => {
                let result =
                    commands::archive_load(settings, path.as_deref(), id.as_deref(), no_unpack)?;
                output(&result, human);
            }
            ArchiveCommands::Cleanup => {
                let result = commands::archive_cleanup(settings)?;
                output(&result, human);
            }
            ArchiveCommands::Watch { load } => {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .build()?;
                runtime.block_on(commands::archive_watch(settings, load, |event| {
                    output(event, human)
                }))?;
            }
            ArchiveCommands::Diff {
                first,
                second,
                board,
                out,
            } => {
                let result = commands::archive_diff(
                    settings,
                    &first,
                    &second,
                    board.as_deref(),
                    out.as_deref(),
                )?;
                output(&result, human);
            }
        },
        Commands::Search { command } => {
            let session = Session::open(settings, archive)?;
            match command {
                SearchCommands::Boards { query, from, to } => {
                    let result = commands::search_boards(
                        &session,
                        query.as_deref(),
                        from.as_deref(),
                        to.as_deref(),
                    )?;
                    output(&result, human);
                }
                SearchCommands::Cards {
                    query,
                    board,
                    from,
                    to,
                } => {
                    let result = commands::search_cards(
                        &session,
                        query.as_deref(),
                        board.as_deref(),
                        from.as_deref(),
                        to.as_deref(),
                    )?;
                    output(&result, human);
                }
            }
        }
        Commands::Board { command } => {
            let session = Session::open(settings, archive)?;
            match command {
                BoardCommands::Show {
                    id,
                    cards,
                    connections,
                } => {
                    let result = commands::board_show(&session, &id, cards, connections)?;
                    output(&result, human);
                }
                BoardCommands::Export {
                    id,
                    out,
                    format,
                    no_cards,
                    connections,
                    metadata,
                } => {
                    let result = commands::board_export(
                        &session,
                        &id,
                        &out,
                        &format,
                        no_cards,
                        connections,
                        metadata,
                    )?;
                    output(&result, human);
                }
                BoardCommands::Summarize { id, format, stats } => {
                    let result = commands::board_summarize(&session, &id, &format, stats)?;
                    output(&result, human);
                }
            }
        }
        Commands::Card { command } => {
            let session = Session::open(settings, archive)?;
            match command {
                CardCommands::Show {
                    id,
                    format,
                    related,
                } => {
                    let result = commands::card_show(&session, &id, &format, related)?;
                    output(&result, human);
                }
                CardCommands::Content { id, format } => {
                    let result = commands::card_content(&session, &id, &format)?;
                    output(&result, human);
                }
                CardCommands::Area {
                    board,
                    x,
                    y,
                    radius,
                } => {
                    let result = commands::card_area(&session, &board, x, y, radius)?;
                    output(&result, human);
                }
            }
        }
        Commands::Analyze {
            board,
            metrics,
            out,
        } => {
            let session = Session::open(settings, archive)?;
            let result =
                commands::analyze(&session, board.as_deref(), &metrics, out.as_deref())?;
            output(&result, human);
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => output(settings, human),
        },
        Commands::Debug => {
            let result = commands::debug_info(settings);
            output(&result, human);
        }
    }
    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
