use super::Context;

/// Print the reminder schedule projected from persisted offsets.
pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open()?;
    let scheduler = ctx.service.scheduler();
    scheduler.reschedule_all()?;
    let jobs = scheduler.jobs();

    if json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }

    if jobs.is_empty() {
        println!("no users yet");
        return Ok(());
    }
    for job in jobs {
        println!("{:<20} {:02}:00 UTC", job.user_id.as_str(), job.fire_hour);
    }
    Ok(())
}
