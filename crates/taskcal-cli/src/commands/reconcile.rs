use taskcal_core::integrations::keyring_store;
use taskcal_core::{
    run_locked, Config, GoogleCalendar, GoogleCalendarSettings, Notifier, NullNotifier,
    ReconcileConfig, Reconciler, RunLock, RunOutcome, SheetDb, SlackWebhook,
};

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let reconcile_config = ReconcileConfig::from_settings(&config.reconcile)?;
    let lock = RunLock::new(config.lock_path()?, config.reconcile.lock_timeout());

    // Nothing is opened until the lock is held.
    let outcome = run_locked(&lock, || -> Result<_, Box<dyn std::error::Error>> {
        let sheet = SheetDb::open(&config.sheet_path()?)?;
        let calendar = GoogleCalendar::new(calendar_settings(&config)?)?;
        let notifier = notifier(&config)?;
        Ok(Reconciler::new(sheet, calendar, notifier).with_config(reconcile_config))
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match outcome {
        RunOutcome::Completed(summary) => {
            println!("{}", summary.message());
            for failure in &summary.failures {
                println!(
                    "  {} [{:?}] {}: {}",
                    failure.task_id, failure.phase, failure.event_id, failure.message
                );
            }
            for failure in &summary.row_delete_failures {
                println!("  row {}: {}", failure.row_index, failure.message);
            }
        }
        RunOutcome::LockBusy { lock_path, waited_ms } => {
            println!(
                "Another run holds {} (waited {waited_ms}ms); skipped.",
                lock_path.display()
            );
        }
    }
    Ok(())
}

/// Calendar settings; the token comes from the config file or the keyring.
fn calendar_settings(config: &Config) -> Result<GoogleCalendarSettings, Box<dyn std::error::Error>> {
    let access_token = match config.calendar.access_token.clone().filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => keyring_store::get(keyring_store::GOOGLE_TOKEN)?
            .ok_or("no Google access token; run `taskcal auth google login --token <TOKEN>`")?,
    };

    Ok(GoogleCalendarSettings {
        base_url: config.calendar.base_url.clone(),
        calendar_id: config.calendar.calendar_id.clone(),
        access_token,
        time_zone: config.calendar.time_zone.clone(),
    })
}

fn notifier(config: &Config) -> Result<Box<dyn Notifier>, Box<dyn std::error::Error>> {
    let webhook_url = match config.notify.webhook_url.clone().filter(|u| !u.is_empty()) {
        Some(url) => Some(url),
        None => keyring_store::get(keyring_store::SLACK_WEBHOOK).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "keyring unavailable; notifications disabled");
            None
        }),
    };

    let notifier: Box<dyn Notifier> = match webhook_url {
        Some(url) => Box::new(SlackWebhook::new(&url)?),
        None => Box::new(NullNotifier),
    };
    Ok(notifier)
}
