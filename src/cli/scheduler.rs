//! Timer, keyboard and connectivity driven scheduling for `watch`.

use crate::core::schedule::{Event, Scheduler, Trigger};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::io::BufRead;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Refresh,
    Quit,
}

/// Maps a line typed by the user to a command. Unknown input is ignored.
pub fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_lowercase().as_str() {
        "" | "r" | "refresh" => Some(Command::Refresh),
        "q" | "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

/// Reads commands from stdin until EOF or `q`.
pub fn spawn_stdin_commands() -> mpsc::Receiver<Command> {
    spawn_line_commands(std::io::BufReader::new(std::io::stdin()))
}

/// Reads commands line by line on a dedicated thread.
///
/// The read blocks outside the runtime, so shutting the runtime down never
/// waits for the next line.
pub fn spawn_line_commands<R>(input: R) -> mpsc::Receiver<Command>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(8);
    let reader = std::thread::Builder::new()
        .name("coinwatch-input".to_string())
        .spawn(move || {
            for line in input.lines() {
                let Ok(line) = line else { break };
                let Some(command) = parse_command(&line) else {
                    continue;
                };
                if tx.blocking_send(command).is_err() || command == Command::Quit {
                    break;
                }
            }
            debug!("Input closed, manual refresh disabled");
        });
    if let Err(e) = reader {
        warn!("Manual refresh disabled, could not read input: {e}");
    }
    rx
}

/// Periodically probes the price host and publishes whether it is reachable.
///
/// The channel starts out as online.
pub fn spawn_connectivity_monitor(base_url: &str, period: Duration) -> Result<watch::Receiver<bool>> {
    let url = reqwest::Url::parse(base_url)
        .with_context(|| format!("Invalid price source URL: {base_url}"))?;
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("Price source URL has no host: {base_url}"))?
        .to_string();
    let port = url
        .port_or_known_default()
        .ok_or_else(|| anyhow!("Price source URL has no port: {base_url}"))?;

    let (tx, rx) = watch::channel(true);
    tokio::spawn(async move {
        loop {
            let online = matches!(
                tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect((host.as_str(), port))).await,
                Ok(Ok(_))
            );
            tx.send_if_modified(|current| {
                if *current != online {
                    debug!(online, "Connectivity changed");
                    *current = online;
                    true
                } else {
                    false
                }
            });
            if tx.is_closed() {
                break;
            }
            tokio::time::sleep(period).await;
        }
    });
    Ok(rx)
}

/// Starts with an initial refresh, then refreshes on every tick of a
/// fixed interval, on manual commands and when connectivity returns.
pub struct IntervalScheduler {
    started: bool,
    interval: Interval,
    commands: Option<mpsc::Receiver<Command>>,
    connectivity: Option<watch::Receiver<bool>>,
    online: bool,
}

impl IntervalScheduler {
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        // A tick missed while a cycle ran is dropped, not replayed
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            started: false,
            interval,
            commands: None,
            connectivity: None,
            online: true,
        }
    }

    pub fn with_commands(mut self, commands: mpsc::Receiver<Command>) -> Self {
        self.commands = Some(commands);
        self
    }

    pub fn with_connectivity(mut self, connectivity: watch::Receiver<bool>) -> Self {
        self.online = *connectivity.borrow();
        self.connectivity = Some(connectivity);
        self
    }
}

async fn next_command(commands: &mut Option<mpsc::Receiver<Command>>) -> Option<Command> {
    match commands {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_connectivity(connectivity: &mut Option<watch::Receiver<bool>>) -> Option<bool> {
    match connectivity {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(*rx.borrow_and_update()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}

#[async_trait]
impl Scheduler for IntervalScheduler {
    async fn next_event(&mut self) -> Option<Event> {
        if !self.started {
            self.started = true;
            return Some(Event::Refresh(Trigger::Initial));
        }

        loop {
            tokio::select! {
                _ = self.interval.tick() => return Some(Event::Refresh(Trigger::Timer)),
                command = next_command(&mut self.commands) => match command {
                    Some(Command::Refresh) => return Some(Event::Refresh(Trigger::Manual)),
                    Some(Command::Quit) => return None,
                    None => self.commands = None,
                },
                online = next_connectivity(&mut self.connectivity) => match online {
                    Some(online) if online != self.online => {
                        self.online = online;
                        return Some(if online {
                            Event::Refresh(Trigger::Reconnected)
                        } else {
                            Event::Offline
                        });
                    }
                    Some(_) => {}
                    None => self.connectivity = None,
                },
            }
        }
    }
}
