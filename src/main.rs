use std::path::PathBuf;

use crate::app::App;

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod daemon_json;
pub mod event;
pub mod log;
pub mod node;
pub mod notify;
pub mod prefs;
pub mod ui;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = cli::setup().get_matches();

    // Logging has to be settled before the TUI takes the terminal over;
    // a bad --logfile should fail loudly, not silently swallow diagnostics.
    let logfile = args.get_one::<String>("logfile").cloned();
    if let Err(err) = log::init(logfile, args.get_flag("verbose")) {
        eprintln!("{err}");
        std::process::exit(1);
    }

    let config_dir = match args.get_one::<String>("config_dir") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("opensnitch-prefs"),
    };
    let demo_nodes = *args.get_one::<u64>("demo_nodes").unwrap_or(&0);

    let terminal = ratatui::init();
    let app = App::new(config_dir, demo_nodes);
    let result = app.run(terminal).await;
    ratatui::restore();
    result
}
