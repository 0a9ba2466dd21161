use taskcal_core::{Config, SheetDb};

pub fn run(limit: Option<usize>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = SheetDb::open(&config.sheet_path()?)?;
    let entries = db.log_entries(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Audit log is empty.");
        return Ok(());
    }
    for entry in &entries {
        let mut line = format!(
            "{}  {:<22} {:<12} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.operation.as_str(),
            entry.task_id,
            entry.event_id
        );
        if !entry.error.is_empty() {
            line.push_str(&format!("  error: {}", entry.error));
        }
        println!("{line}");
    }
    Ok(())
}
