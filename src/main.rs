use clap::Parser;
use rosterwatch::cli::{Cli, Command};
use rosterwatch::config::{SettingsStore, ROSTER_NAMES};
use rosterwatch::notify::ConsoleSink;
use rosterwatch::source::DirSource;
use rosterwatch::store::sqlite::SqliteBackend;
use rosterwatch::store::Store;
use rosterwatch::sync;

fn open_store(settings: &mut SettingsStore) -> Store<SqliteBackend> {
    let backend = match SqliteBackend::open_default() {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("Error opening database: {e}");
            std::process::exit(1);
        }
    };
    match Store::open(backend, settings) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening capture history: {e}");
            std::process::exit(1);
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let mut settings = match SettingsStore::open_default() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error opening settings: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Sync(args) => {
            let names = match args.names {
                Some(names) => names,
                None => match settings.get(&ROSTER_NAMES) {
                    Ok(names) => names,
                    Err(e) => {
                        eprintln!("Error reading configured rosters: {e}");
                        std::process::exit(1);
                    }
                },
            };
            if names.is_empty() {
                eprintln!(
                    "No rosters configured. Use 'rosterwatch sources --set <names>' or pass --names."
                );
                std::process::exit(1);
            }

            let mut store = open_store(&mut settings);
            let source = DirSource::new(args.dir);

            let result = if args.json {
                // suppress the text sink, the diff set is printed below
                let mut sink = ConsoleSink::new(std::io::sink());
                sync::run_cycle(&mut store, &source, &names, &mut sink)
            } else {
                let mut sink = ConsoleSink::new(std::io::stdout());
                sync::run_cycle(&mut store, &source, &names, &mut sink)
            };

            match result {
                Ok(diffs) => {
                    if args.json {
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&diffs)
                                .unwrap_or_else(|_| "{}".to_string())
                        );
                    } else if diffs.is_empty() {
                        println!("No changes detected.");
                    }
                }
                Err(e) => {
                    eprintln!("Error during sync: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Latest(args) => {
            let store = open_store(&mut settings);
            match store.latest() {
                Ok(Some(capture)) => {
                    if args.json {
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&capture.collection)
                                .unwrap_or_else(|_| "{}".to_string())
                        );
                    } else {
                        let datetime = capture.timestamp.format("%Y-%m-%d %H:%M:%S");
                        println!("Capture from {datetime}");
                        for (roster, items) in capture.collection.iter() {
                            println!("\n{roster} ({} items):", items.len());
                            for item in items {
                                println!("  {} [{}]", item.title, item.external_id);
                            }
                        }
                    }
                }
                Ok(None) => {
                    eprintln!("No captures found. Run 'rosterwatch sync' to create one.");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Error loading latest capture: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::History => {
            let store = open_store(&mut settings);
            let history = store.history();
            if history.is_empty() {
                println!("No captures found. Run 'rosterwatch sync' to create one.");
            } else {
                println!("Captures:");
                for entry in history {
                    println!("  {}", entry.timestamp.format("%Y-%m-%d %H:%M:%S"));
                }
            }
        }
        Command::Sources(args) => match args.set {
            Some(names) => {
                if let Err(e) = settings.set(&ROSTER_NAMES, &names) {
                    eprintln!("Error saving roster names: {e}");
                    std::process::exit(1);
                }
                println!("Tracking {} rosters.", names.len());
            }
            None => match settings.get(&ROSTER_NAMES) {
                Ok(names) => {
                    if names.is_empty() {
                        println!("No rosters configured.");
                    } else {
                        for name in names {
                            println!("{name}");
                        }
                    }
                }
                Err(e) => {
                    eprintln!("Error reading configured rosters: {e}");
                    std::process::exit(1);
                }
            },
        },
    }
}
