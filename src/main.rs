use std::{fs, process, time::Duration};

use color_eyre::Result;
use mysh::{
    config::Config,
    env::ProcessEnv,
    input::{InputMessage, LineReader},
    jobs,
    state::{Flow, Shell},
};
use tokio::{
    select,
    signal::unix::{signal, Signal, SignalKind},
    task, time,
};
use tracing_subscriber::prelude::*;

#[macro_use]
extern crate tracing;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let (config, config_error) = match Config::load(&ProcessEnv) {
        Ok(config) => (config, None),
        Err(err) => (Config::default(), Some(err)),
    };

    let log_dir = config.log_dir();
    fs::create_dir_all(&log_dir)?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&log_dir, "mysh.log"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_error::ErrorLayer::default())
        .init();

    color_eyre::install()?;

    if let Some(err) = config_error {
        error!(%err, "falling back to default config");
        eprintln!("mysh: {err}; using defaults");
    }

    let code = run(config).await?;
    info!(code, "exiting");

    drop(guard);
    process::exit(code)
}

async fn run(config: Config) -> Result<i32> {
    let mut shell = Shell::new(config);

    trace!("spawning reaper");
    jobs::spawn_reaper(shell.jobs().clone())?;

    let mut interrupts = signal(SignalKind::interrupt())?;

    trace!("spawning input thread");
    let mut input = LineReader::spawn();

    shell.greet()?;
    shell.prompt()?;
    input.request();

    loop {
        select! {
            Some(msg) = input.recv() => match msg {
                InputMessage::Line(line) => {
                    trace!(line = line.trim_end(), "read line");

                    if let Flow::Exit(code) = task::block_in_place(|| shell.execute_line(&line)) {
                        return Ok(code);
                    }

                    // a Ctrl-C aimed at the foreground child was seen by us too
                    drain(&mut interrupts).await;
                }
                InputMessage::Eof => {
                    println!();
                    return Ok(shell.last_status().code());
                }
                InputMessage::Error(err) => {
                    error!(%err, "failed to read input");
                    eprintln!("mysh: {err}");
                    return Ok(1);
                }
            },
            Some(()) = interrupts.recv() => {
                trace!("interrupted at the prompt");
                println!();
                shell.prompt()?;
                continue;
            }
            else => return Ok(shell.last_status().code()),
        }

        shell.prompt()?;
        input.request();
    }
}

/// Discards an interrupt that arrived while a command was running.
async fn drain(interrupts: &mut Signal) {
    let _ = time::timeout(Duration::ZERO, interrupts.recv()).await;
}
