//! Long-running mode: reminders fire in the background while chat lines are
//! read from stdin, one `<user> <message>` per line.

use calmstep_core::UserId;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::chat::{respond, ChatCommand};
use super::Context;

/// Split an input line into the user id and the message text.
pub fn parse_line(line: &str) -> Option<(UserId, ChatCommand)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (user, message) = match line.split_once(char::is_whitespace) {
        Some((user, message)) => (user, message),
        None => (line, ""),
    };
    Some((UserId::new(user), ChatCommand::parse(message)))
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(ctx))
}

async fn serve(ctx: Context) -> Result<(), Box<dyn std::error::Error>> {
    let scheduler = ctx.service.scheduler().clone();
    let restored = scheduler.reschedule_all()?;
    tracing::info!(jobs = restored, "reminder schedule restored");

    let handle = if ctx.config.reminders.enabled {
        Some(scheduler.clone().run())
    } else {
        tracing::info!("reminders disabled");
        None
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                None
            }
        };
        let Some(line) = line else { break };
        let Some((user, command)) = parse_line(&line) else {
            continue;
        };
        match respond(&ctx.service, &user, command, ctx.local_hour()) {
            Ok(reply) => println!("[{user}] {reply}"),
            Err(e) => {
                tracing::warn!(user = %user, error = %e, "command failed");
                println!("[{user}] error: {e}");
            }
        }
    }

    scheduler.shutdown();
    if let Some(handle) = handle {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "scheduler task ended abnormally");
        }
    }
    Ok(())
}
