//! Message text shown to users.

use calmstep_core::{DayStatus, Phase, Reminder, Stats, TimezoneUpdate, TodayTask};
use indoc::{formatdoc, indoc};
use rand::seq::SliceRandom;

const ANCHORS: &[&str] = &[
    "Name 3 things around you that you can see.",
    "Feel 3 surfaces you are touching right now.",
    "Take 3 slow breaths out, each one longer than the last.",
    "Say out loud: 'I can feel anxious and still act.'",
    "Close your eyes and listen for 3 sounds around you.",
];

const PRACTICE: &str = indoc! {"
    Morning:
    1. Breathe: in for 4s, hold for 4s, out for 6s.
    2. Ask yourself: what can I do today despite the anxiety?
    3. Take one small step. Any step, but take it.

    Evening:
    1. Dump every thought into a note.
    2. Sort out what needs action and what is just noise.
    3. Thank yourself.
"};

pub fn welcome(program_length: u32, created: bool) -> String {
    if created {
        format!(
            "Welcome to the {program_length}-day calm program! Every day you get a short \
             morning and evening practice. Send 'today' to begin."
        )
    } else {
        "Welcome back! Send 'today' to see today's practice.".to_string()
    }
}

pub fn today(task: &TodayTask) -> String {
    let heading = match task.program_day {
        Some(_) if task.is_past_program() => format!(
            "Day: {} (the {}-day program is complete, keep going if it helps)",
            task.date, task.program_length
        ),
        Some(day) => format!("Day: {} ({day} of {})", task.date, task.program_length),
        None => format!("Day: {}", task.date),
    };

    formatdoc! {"
        {heading}

        {PRACTICE}
        {progress}
        Send 'done morning' or 'done evening' as you go.",
        progress = progress_line(&task.status),
    }
}

fn progress_line(status: &DayStatus) -> String {
    let mark = |phase| if status.is_done(phase) { "done" } else { "open" };
    format!(
        "Morning: {}, evening: {}.",
        mark(Phase::Morning),
        mark(Phase::Evening)
    )
}

pub fn done(phase: Phase) -> &'static str {
    match phase {
        Phase::Morning => "Morning practice done. A good start to the day!",
        Phase::Evening => "Evening practice done. Sleep well!",
    }
}

pub fn stats(stats: &Stats) -> String {
    format!(
        "Fully completed: {} of {} days",
        stats.completed_days, stats.total_days
    )
}

pub fn timezone_prompt() -> &'static str {
    "Send your UTC offset in whole hours, for example +3 or -5."
}

pub fn timezone_set(update: &TimezoneUpdate, local_hour: u8) -> String {
    match &update.job {
        Some(job) => format!(
            "Timezone set to {}. Reminders arrive at {local_hour:02}:00 your time ({:02}:00 UTC).",
            update.offset, job.fire_hour
        ),
        None => format!("Timezone set to {}.", update.offset),
    }
}

pub fn anchor() -> String {
    let pick = ANCHORS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("Breathe out slowly.");
    format!("Grounding anchor:\n{pick}")
}

pub fn reminder(reminder: &Reminder) -> String {
    match reminder.program_day {
        Some(day) if day <= reminder.program_length => format!(
            "Good morning! Day {day} of {} is waiting. Send 'today' to see your practice.",
            reminder.program_length
        ),
        _ => "Good morning! Send 'today' to see your practice.".to_string(),
    }
}
