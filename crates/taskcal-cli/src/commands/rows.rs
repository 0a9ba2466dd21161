use chrono::NaiveDate;
use clap::Subcommand;
use taskcal_core::{Config, SheetDb, TaskSheet};

#[derive(Subcommand)]
pub enum RowsAction {
    /// Append a row to the task sheet
    Add {
        /// Task subject (event title)
        subject: String,
        /// Task identifier shared by all rows of one task
        #[arg(long)]
        task_id: String,
        /// Task status; the configured completion status closes the task
        #[arg(long, default_value = "open")]
        status: String,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// List task sheet rows
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: RowsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut db = SheetDb::open(&config.sheet_path()?)?;

    match action {
        RowsAction::Add {
            subject,
            task_id,
            status,
            due,
        } => {
            if task_id.trim().is_empty() {
                return Err("--task-id must not be empty".into());
            }
            let row = db.append_row(&subject, due, &task_id, &status, "")?;
            println!("Row {row} added for task {task_id}");
        }
        RowsAction::List { json } => {
            let rows = db.read_rows()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("No rows.");
            } else {
                for row in &rows {
                    let due = row
                        .due_date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".into());
                    let event = if row.event_id.is_empty() {
                        "-"
                    } else {
                        row.event_id.as_str()
                    };
                    println!(
                        "{:>4}  {:<12} {:<10} {:<10} {:<24} {}",
                        row.row_index, row.task_id, row.status, due, event, row.subject
                    );
                }
            }
        }
    }
    Ok(())
}
