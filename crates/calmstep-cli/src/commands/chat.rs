//! Conversation commands shared by the one-shot subcommands and `serve`.

use calmstep_core::{CoreError, Phase, ProgramService, TextOutcome, UserId};

use crate::texts;

/// One inbound user message, already parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Start,
    Today,
    Done(Phase),
    Stats,
    /// `None` asks the user for an offset in the next message.
    Timezone(Option<String>),
    Panic,
    Text(String),
}

impl ChatCommand {
    /// Parse the message part of a `serve` line. Leading slashes are accepted
    /// so chat-style input like `/done_morning` works too.
    pub fn parse(message: &str) -> Self {
        let message = message.trim();
        let mut words = message.split_whitespace();
        let head = words
            .next()
            .unwrap_or_default()
            .trim_start_matches('/')
            .to_ascii_lowercase();
        let rest: Vec<&str> = words.collect();

        match (head.as_str(), rest.as_slice()) {
            ("start", []) => ChatCommand::Start,
            ("today", []) => ChatCommand::Today,
            ("done_morning", []) => ChatCommand::Done(Phase::Morning),
            ("done_evening", []) => ChatCommand::Done(Phase::Evening),
            ("done", [phase]) => match phase.parse() {
                Ok(phase) => ChatCommand::Done(phase),
                Err(_) => ChatCommand::Text(message.to_string()),
            },
            ("stats", []) => ChatCommand::Stats,
            ("timezone", []) => ChatCommand::Timezone(None),
            ("timezone", [offset]) => ChatCommand::Timezone(Some((*offset).to_string())),
            ("panic", []) => ChatCommand::Panic,
            _ => ChatCommand::Text(message.to_string()),
        }
    }
}

/// Run `command` for `user` and produce the reply text.
pub fn respond(
    service: &ProgramService,
    user: &UserId,
    command: ChatCommand,
    local_hour: u8,
) -> Result<String, CoreError> {
    let reply = match command {
        ChatCommand::Start => {
            let onboarding = service.onboard(user)?;
            texts::welcome(service.program_length(), onboarding.created)
        }
        ChatCommand::Today => texts::today(&service.today_task(user)?),
        ChatCommand::Done(phase) => {
            service.mark_done(user, phase)?;
            texts::done(phase).to_string()
        }
        ChatCommand::Stats => texts::stats(&service.stats(user)?),
        ChatCommand::Timezone(Some(offset)) => {
            let update = service.update_timezone_from_text(user, &offset)?;
            texts::timezone_set(&update, local_hour)
        }
        ChatCommand::Timezone(None) => {
            service.request_timezone(user)?;
            texts::timezone_prompt().to_string()
        }
        ChatCommand::Panic => texts::anchor(),
        ChatCommand::Text(text) => match service.handle_text(user, &text) {
            Ok(TextOutcome::TimezoneUpdated(update)) => texts::timezone_set(&update, local_hour),
            Ok(TextOutcome::Ignored) => {
                "Unknown command. Try: start, today, done morning, done evening, stats, timezone, panic."
                    .to_string()
            }
            Err(CoreError::Validation(e)) => format!("{e}. {}", texts::timezone_prompt()),
            Err(e) => return Err(e),
        },
    };
    Ok(reply)
}
