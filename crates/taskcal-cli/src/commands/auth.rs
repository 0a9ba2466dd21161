use clap::Subcommand;
use taskcal_core::integrations::keyring_store;
use taskcal_core::SlackWebhook;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Google Calendar: login / logout / status
    Google {
        #[command(subcommand)]
        action: AuthOp,
    },
    /// Slack failure notifications: login / logout / status
    Slack {
        #[command(subcommand)]
        action: AuthOp,
    },
}

#[derive(Subcommand)]
pub enum AuthOp {
    /// Store credentials in the OS keyring
    Login {
        /// OAuth access token (for Google)
        #[arg(long)]
        token: Option<String>,
        /// Incoming webhook URL (for Slack)
        #[arg(long)]
        webhook_url: Option<String>,
    },
    /// Remove credentials
    Logout,
    /// Check whether credentials are stored
    Status,
}

pub fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AuthAction::Google { action: op } => handle_google(op),
        AuthAction::Slack { action: op } => handle_slack(op),
    }
}

fn handle_google(op: AuthOp) -> Result<(), Box<dyn std::error::Error>> {
    match op {
        AuthOp::Login { token, .. } => {
            let token = token.ok_or("--token required for Google")?;
            if token.trim().is_empty() {
                return Err("--token must not be empty".into());
            }
            keyring_store::set(keyring_store::GOOGLE_TOKEN, token.trim())?;
            println!("Google token stored");
        }
        AuthOp::Logout => {
            keyring_store::delete(keyring_store::GOOGLE_TOKEN)?;
            println!("Google token removed");
        }
        AuthOp::Status => print_status(keyring_store::GOOGLE_TOKEN)?,
    }
    Ok(())
}

fn handle_slack(op: AuthOp) -> Result<(), Box<dyn std::error::Error>> {
    match op {
        AuthOp::Login { webhook_url, .. } => {
            let url = webhook_url.ok_or("--webhook-url required for Slack")?;
            // Reject malformed URLs before they reach the keyring.
            SlackWebhook::new(&url)?;
            keyring_store::set(keyring_store::SLACK_WEBHOOK, &url)?;
            println!("Slack webhook stored");
        }
        AuthOp::Logout => {
            keyring_store::delete(keyring_store::SLACK_WEBHOOK)?;
            println!("Slack webhook removed");
        }
        AuthOp::Status => print_status(keyring_store::SLACK_WEBHOOK)?,
    }
    Ok(())
}

fn print_status(key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let stored = keyring_store::get(key)?.is_some();
    println!("{}", if stored { "authenticated" } else { "not authenticated" });
    Ok(())
}
