use std::io;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, unbounded};
use tracing::{info, warn};

use shared_resources::config::Config;

use crate::controller::Controller;

pub mod backup;
pub mod console;
pub mod demo;
pub mod server;

use console::Ending;
use server::Server;

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub demo: bool,
    pub headless: bool,
}

/// Wires the fleet to its collaborators and runs the console until the operator leaves.
pub fn run(config: Config, options: Options) -> io::Result<()> {
    // RESTORE FROM BACKUP
    let mut persisted = Vec::new();
    let mut events_tx = None;
    let mut backup_thread = None;
    if config.backup.enabled {
        persisted = backup::load_snapshot(&config.backup.dir).unwrap_or_else(|e| {
            warn!("ignoring backup: {e}");
            Vec::new()
        });

        let (tx, rx) = unbounded();
        let dir = config.backup.dir.clone();
        backup_thread = Some(
            thread::Builder::new()
                .name("backup".to_string())
                .spawn(move || backup::main(dir, rx))?,
        );
        events_tx = Some(tx);
    }

    // INITIALIZE CONTROLLER
    let controller = Arc::new(Controller::restore(&config, events_tx, &persisted));
    controller.start()?;

    // INITIALIZE NETWORK SERVICE
    let mut server = if config.server.enabled {
        Some(Server::start(Arc::clone(&controller), config.server.port)?)
    } else {
        None
    };

    // INITIALIZE DEMO
    let mut demo = None;
    if options.demo {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let controller = Arc::clone(&controller);
        let pace = config.elevator.floor_travel();
        let handle = thread::Builder::new()
            .name("demo".to_string())
            .spawn(move || demo::main(controller, pace, shutdown_rx))?;
        demo = Some((shutdown_tx, handle));
    }

    let ending = console::main(Arc::clone(&controller), config.console.refresh(), options.headless)?;

    // SHUT DOWN
    if let Some((shutdown_tx, handle)) = demo {
        if ending == Ending::Exit {
            drop(shutdown_tx);
        } else {
            info!("input closed, waiting for the demo to finish");
        }
        if handle.join().is_err() {
            warn!("demo panicked");
        }
    }
    if let Some(server) = server.as_mut() {
        server.stop();
    }
    drop(server);
    controller.stop();
    drop(controller);

    // every event sender is gone once the controller is dropped
    if let Some(handle) = backup_thread {
        if handle.join().is_err() {
            warn!("backup panicked");
        }
    }
    Ok(())
}
