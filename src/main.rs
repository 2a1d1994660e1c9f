mod app;
mod clock;
mod config;
mod describe;
mod devices;
mod keyboard;
mod message_log;
mod midi;
mod router;
mod shell;

use anyhow::Result;
use env_logger::Env;
use std::sync::mpsc::sync_channel;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env()?;
    log::info!("🖖 Starting {} (type `help` for commands)", config.client_name);

    // pipeline: MIDI in / keyboard → router → output + UI queue → log
    let (tx, rx) = sync_channel::<app::UiMessage>(config.queue_capacity);

    let clock = clock::Clock::new();
    let router = router::Router::new(tx.clone());
    let subsystem = devices::MidirSubsystem::new(&config.client_name);
    let mut app = app::App::new(subsystem, router, clock, &config);

    let _stdin = shell::spawn_reader(tx)?;
    app.run(&rx, &mut std::io::stdout().lock())
}
