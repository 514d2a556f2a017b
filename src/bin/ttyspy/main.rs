//! TTYSpy entrypoint: log in to AMI, pick a channel, relay TDD text.
//!
//! # Architecture
//!
//! - Input thread: reads stdin and forwards raw bytes
//! - AMI reader: routes action responses and queues unsolicited events
//! - Event pump: feeds events to the inbound handler
//! - Main thread: channel selection and the keystroke loop

use anyhow::{bail, Result};
use crossbeam_channel::bounded;
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;
use ttyspy::ami::AmiClient;
use ttyspy::config::AppConfig;
use ttyspy::input::{spawn_input_thread, InputReader};
use ttyspy::relay::{
    spawn_event_pump, EngineExit, EngineOptions, RelayEngine, Session, TerminalWriter,
};
use ttyspy::signals::{install_sigint_handler, interrupt_flag};
use ttyspy::terminal_restore::{NoTerminal, RawModeSwitch, TerminalRestoreGuard};
use ttyspy::{init_logging, init_tracing, log_debug, log_file_path};

/// Max pending stdin chunks before backpressure.
const INPUT_CHANNEL_CAPACITY: usize = 256;

/// Max unsolicited AMI events waiting for the pump.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Exit status after Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("ttyspy: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let mut config = AppConfig::parse_args()?;
    init_logging(&config);
    init_tracing(&config);
    log_debug("=== TTYSpy Started ===");
    log_debug(&format!("Log file: {:?}", log_file_path()));
    config.resolve_password()?;

    install_sigint_handler()?;

    let (client, events_rx) = AmiClient::connect(
        &config.host,
        config.port,
        config.action_timeout(),
        EVENT_CHANNEL_CAPACITY,
    )?;
    let username = config.username.as_deref().unwrap_or_default();
    let password = config.password.as_deref().unwrap_or_default();
    client.login(username, password)?;

    let session = Arc::new(Session::new(Box::new(TerminalWriter::stdout())));
    let (input_tx, input_rx) = bounded(INPUT_CHANNEL_CAPACITY);
    let _input_handle = spawn_input_thread(input_tx.clone());
    let _pump_handle = spawn_event_pump(Arc::clone(&session), events_rx, input_tx);
    let mut input = InputReader::new(input_rx);

    let terminal_guard = io::stdin().is_terminal().then(TerminalRestoreGuard::new);
    let terminal: &dyn RawModeSwitch = match &terminal_guard {
        Some(guard) => guard,
        None => &NoTerminal,
    };

    let options = EngineOptions {
        initial_leg: config.channel.clone(),
        always_refresh: config.always_refresh,
        ..EngineOptions::default()
    };
    let exit =
        RelayEngine::new(&client, terminal, &session, options).run(&mut input, interrupt_flag());

    if let Some(guard) = &terminal_guard {
        guard.restore();
    }
    println!();
    log_debug(&format!("=== TTYSpy Exiting: {exit:?} ==="));

    match exit {
        EngineExit::Quit | EngineExit::InputClosed => {
            client.logoff();
            Ok(ExitCode::SUCCESS)
        }
        EngineExit::Interrupted => {
            client.logoff();
            eprintln!("ttyspy: interrupted");
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        }
        EngineExit::TransportClosed => bail!("AMI was forcibly disconnected"),
    }
}
