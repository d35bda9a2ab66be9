use calmstep_core::{Phase, UserId};
use clap::Subcommand;

use super::chat::{respond, ChatCommand};
use super::Context;

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Start the program for a user
    Start {
        /// User id
        user: String,
    },
    /// Show today's practice, opening today's entry
    Today {
        user: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a phase of today's practice done
    Done {
        user: String,
        /// morning or evening
        phase: Phase,
    },
    /// Show completed vs. touched days
    Stats {
        user: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the user's UTC offset in hours (-12..=14)
    Timezone {
        user: String,
        #[arg(allow_hyphen_values = true)]
        offset: String,
    },
    /// Print a random grounding anchor
    Panic,
}

pub fn run(action: ProgressAction) -> Result<(), Box<dyn std::error::Error>> {
    if let ProgressAction::Panic = action {
        println!("{}", crate::texts::anchor());
        return Ok(());
    }

    let ctx = Context::open()?;
    let service = &ctx.service;

    let (user, command) = match action {
        ProgressAction::Start { user } => (user, ChatCommand::Start),
        ProgressAction::Today { user, json: true } => {
            let task = service.today_task(&UserId::new(user))?;
            println!("{}", serde_json::to_string_pretty(&task)?);
            return Ok(());
        }
        ProgressAction::Today { user, .. } => (user, ChatCommand::Today),
        ProgressAction::Done { user, phase } => (user, ChatCommand::Done(phase)),
        ProgressAction::Stats { user, json: true } => {
            let stats = service.stats(&UserId::new(user))?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }
        ProgressAction::Stats { user, .. } => (user, ChatCommand::Stats),
        ProgressAction::Timezone { user, offset } => (user, ChatCommand::Timezone(Some(offset))),
        ProgressAction::Panic => return Ok(()),
    };

    let reply = respond(service, &UserId::new(user), command, ctx.local_hour())?;
    println!("{reply}");
    Ok(())
}
