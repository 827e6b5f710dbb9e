// src/main.rs

//! Launcher for the plaid render server.

use anyhow::{bail, Context};
use log::{error, info};
use raver_plaid::control::stdin_source::spawn_stdin_source;
use raver_plaid::signals::{block_termination_signals, spawn_signal_watcher};
use raver_plaid::sink::build_sink;
use raver_plaid::{control_channel, Config, RenderServer, RenderSupervisor, Response};
use std::sync::mpsc;

fn main() -> anyhow::Result<()> {
    // Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting raver-plaid...");

    // Must run before any thread is spawned so the mask is inherited.
    let signals = block_termination_signals()?;

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        "Rendering {} pixels at {} fps to {:?}",
        config.render.pixel_count, config.render.fps, config.sink
    );

    let (control_tx, control_rx) = control_channel();
    let (response_tx, response_rx) = mpsc::channel();

    let server =
        RenderServer::new(&config, response_tx).context("Failed to build render server")?;
    let sink = build_sink(&config.sink);
    let supervisor = RenderSupervisor::spawn(server, sink, control_rx)
        .context("Failed to start render server")?;

    match response_rx.recv() {
        Ok(Response::Running) => {
            println!("pixel server running");
            info!("Pixel server started successfully.");
        }
        Ok(Response::ConnectionFailed) => {
            supervisor.join()?;
            bail!("Render server could not connect to display sink {:?}", config.sink);
        }
        Ok(other) => {
            supervisor.shutdown(control_tx)?;
            bail!("Unexpected response from render server: {:?}", other);
        }
        Err(_) => {
            supervisor.join()?;
            bail!("Render server exited before reporting status");
        }
    }

    // The render loop only stops on Quit or channel closure, and the signals
    // are already blocked, so a failed spawn must stop it before returning.
    let sources = spawn_signal_watcher(signals, control_tx.clone())
        .and_then(|_| spawn_stdin_source(control_tx.clone()));
    if let Err(e) = sources {
        supervisor.shutdown(control_tx)?;
        return Err(e.context("Failed to start control sources"));
    }
    drop(control_tx);
    info!("Control: type '<channel> <speed> <freq>' or 'quit'; Ctrl-C also quits");

    let shutdown = response_rx.recv();
    let outcome = supervisor.join()?;

    match shutdown {
        Ok(Response::Quitting) => {
            println!("pixel server quitting");
            info!(
                "Render server stopped cleanly after {} frames",
                outcome.stats.frames_sent
            );
            Ok(())
        }
        Ok(Response::Failed(reason)) => {
            error!("Render server failed: {}", reason);
            bail!("Render server failed: {}", reason)
        }
        Ok(other) => bail!("Unexpected response from render server: {:?}", other),
        Err(_) => bail!("Render server exited without reporting shutdown"),
    }
}
