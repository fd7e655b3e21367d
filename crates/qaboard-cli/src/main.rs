mod bootstrap_helpers;
mod cli_args;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use qaboard_client::{
    execute_board_command, parse_board_command, render_board_screen, BoardApiClient,
    BoardSession, CommandEffect, FileSessionStore, SessionContext, SessionInput,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::Cli;

enum TerminalEvent {
    Interrupted,
    Session(Option<SessionInput>),
    Line(Option<String>),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();
    let config = cli.session_config()?;

    let api = BoardApiClient::new(&cli.api_config())
        .with_context(|| format!("failed to create board client for {}", cli.api_base))?;
    let mut context = SessionContext::hydrate(Box::new(FileSessionStore::new(
        cli.state_file.clone(),
    )))
    .with_context(|| format!("failed to load session state {}", cli.state_file.display()))?;
    if let Some(user_name) = cli.user_name.as_deref() {
        context.set_user_name(user_name);
    }

    info!(
        api_base = %cli.api_base,
        ws_url = %config.connection.ws_url,
        reconnect = ?config.reconnect,
        admin_reconcile = config.admin_reconcile.as_str(),
        "starting board session"
    );
    let mut session = BoardSession::new(config, Arc::new(api), context);
    session.start();
    let result = run_terminal(&mut session).await;
    session.shutdown().await;
    result
}

async fn run_terminal(session: &mut BoardSession) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Type 'help' for commands.");
    redraw(session);

    loop {
        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => TerminalEvent::Interrupted,
            input = session.next_input() => TerminalEvent::Session(input),
            line = lines.next_line() => {
                TerminalEvent::Line(line.context("failed to read command from stdin")?)
            }
        };
        match event {
            TerminalEvent::Interrupted | TerminalEvent::Session(None) | TerminalEvent::Line(None) => {
                return Ok(());
            }
            TerminalEvent::Session(Some(input)) => {
                if session.handle_input(input) {
                    redraw(session);
                }
            }
            TerminalEvent::Line(Some(line)) => {
                let Some(command) = parse_board_command(&line) else {
                    continue;
                };
                match execute_board_command(session, command) {
                    CommandEffect::Render => redraw(session),
                    CommandEffect::Message(message) => {
                        println!("{message}");
                        if session.alert().is_some() {
                            redraw(session);
                        }
                    }
                    CommandEffect::Quit => return Ok(()),
                }
            }
        }
    }
}

fn redraw(session: &mut BoardSession) {
    let rendered = render_board_screen(&session.screen());
    println!("\n{rendered}");
    session.take_alert();
}
