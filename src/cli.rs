use clap::{Arg, ArgAction, Command};

#[must_use]
pub fn setup() -> Command {
    Command::new("opensnitch-prefs")
        .version("0.1.0")
        .about("A terminal preferences panel for OpenSnitch: edit UI defaults locally and push daemon configuration to connected nodes.")
        .arg(
            Arg::new("config_dir")
                .long("config-dir")
                .help("Directory holding the settings file. Defaults to ~/.config/opensnitch-prefs."),
        )
        .arg(
            Arg::new("logfile")
                .long("logfile")
                .help("Append diagnostic logs to this file. Without it, logging is disabled."),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Also log debug lines. Only meaningful together with --logfile."),
        )
        .arg(
            Arg::new("demo_nodes")
                .long("demo-nodes")
                .default_value("2")
                .value_parser(clap::value_parser!(u64).range(0..=16))
                .help("Number of simulated nodes to attach at startup, so the panel can be driven without live daemons. Max: 16."),
        )
        .max_term_width(100)
}
