use clap::{Parser, Subcommand};
use colored::*;
use anyhow::{Result, bail};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use guider_core::format::format_block;
use guider_core::profile::PROFILE_FIELDS;
use guider_core::{AdvisorClient, Config, LineKind, Session, UserProfile, BULLET_GLYPH};
use guider_core::{begin_submission, DisplayLine};

#[derive(Parser)]
#[command(name = "guider")]
#[command(about = "Terminal client for the Gaucho Guider academic advising assistant")]
#[command(version)]
struct Cli {
    /// Advising backend URL (overrides GUIDER_BACKEND_URL and the config file)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        question: String,
    },
    /// List past chats (requires GUIDER_AUTH_TOKEN)
    Sessions,
    /// Show or edit your local profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print the saved profile
    Show,
    /// Update one or more profile fields
    Set {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        major: Option<String>,
        #[arg(long)]
        year: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The client still works without a log file
    if let Err(err) = logging::init() {
        eprintln!("guider: logging disabled: {err:#}");
    }

    let config = Config::load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "could not load config, using defaults");
        Config::new()
    });
    let backend_url = cli.backend_url.clone().unwrap_or_else(|| config.backend_url());
    let client = AdvisorClient::new(&backend_url, config.auth_token());
    tracing::info!(backend = %client.base_url(), "starting guider");

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_tui(&config, client).await?,
        Commands::Ask { question } => ask(&client, &question).await?,
        Commands::Sessions => list_sessions(&client).await?,
        Commands::Profile { action } => profile(action)?,
    }

    Ok(())
}

async fn run_tui(config: &Config, client: AdvisorClient) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new(config, client, events.sender());

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            let Some(event) = events.next().await else { break };
            handler::handle_event(&mut app, event).await?;
        }
        anyhow::Ok(())
    }
    .await;

    app.shutdown();
    tui::restore()?;
    result
}

async fn ask(client: &AdvisorClient, question: &str) -> Result<()> {
    let mut session = Session::new();
    let submission = match begin_submission(&mut session, question) {
        Ok(submission) => submission,
        Err(message) => bail!(message),
    };

    println!("{}", "Thinking...".dimmed());
    let reply = client
        .send_message(&submission.session_id, &submission.message)
        .await?;

    println!();
    for line in format_block(&reply) {
        println!("{}", colorize(&line));
    }

    Ok(())
}

fn colorize(line: &DisplayLine) -> String {
    let body: String = line
        .spans
        .iter()
        .map(|span| {
            if span.bold {
                span.text.bold().to_string()
            } else {
                span.text.clone()
            }
        })
        .collect();

    match line.kind {
        LineKind::Break => String::new(),
        LineKind::Heading => body.bold().yellow().underline().to_string(),
        LineKind::Bullet => format!("{}{}", BULLET_GLYPH.yellow(), body),
        LineKind::Plain => body,
    }
}

async fn list_sessions(client: &AdvisorClient) -> Result<()> {
    if !client.has_auth() {
        println!("{}", "Set GUIDER_AUTH_TOKEN to see your past chats".yellow());
        return Ok(());
    }

    println!("\n{}", "Recent chats".bold().blue());
    println!("{}", "=".repeat(30).dimmed());

    match client.list_sessions().await {
        Ok(sessions) if sessions.is_empty() => println!("{}", "No past chats".dimmed()),
        Ok(sessions) => {
            for session in sessions {
                println!("  • {} {}", session.title.green(), session.chat_session_id.dimmed());
            }
        }
        Err(err) => println!("{}: {}", "Error loading chats".red(), err),
    }

    Ok(())
}

fn profile(action: ProfileAction) -> Result<()> {
    let mut profile = UserProfile::load()?;

    if let ProfileAction::Set { name, email, bio, major, year } = action {
        let values = [name, email, bio, major, year];
        let mut changed = false;
        for (field, value) in PROFILE_FIELDS.into_iter().zip(values) {
            if let Some(value) = value {
                changed |= profile.set_field(field, value);
            }
        }
        if !changed {
            bail!("nothing to update; pass at least one of {}", field_flags());
        }
        profile.save()?;
        println!("{}", "Profile saved".green());
    }

    println!("\n{}", "Profile".bold().blue());
    for (label, value) in profile.fields() {
        println!("  {:<7}{}", label.dimmed(), value);
    }

    Ok(())
}

/// `--name, --email, ...` for every editable profile field
fn field_flags() -> String {
    PROFILE_FIELDS
        .iter()
        .map(|field| format!("--{field}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_to_chat() {
        let cli = Cli::try_parse_from(["guider"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["guider", "--backend-url", "http://x", "ask", "hi"]).unwrap();
        assert_eq!(cli.backend_url.as_deref(), Some("http://x"));
        assert!(matches!(cli.command, Some(Commands::Ask { .. })));
    }

    #[test]
    fn test_colorize_plain_text() {
        colored::control::set_override(false);
        let lines = format_block("## Plan\n- **CS16** first\n\nDone");
        let rendered: Vec<String> = lines.iter().map(colorize).collect();
        assert_eq!(rendered, vec!["Plan", "• CS16 first", "", "Done"]);
    }

    #[test]
    fn test_field_flags_cover_every_field() {
        assert_eq!(field_flags(), "--name, --email, --bio, --major, --year");
    }

    #[tokio::test]
    async fn test_ask_failure_is_an_error() {
        let client = AdvisorClient::new("http://127.0.0.1:9", None);
        let err = ask(&client, "Is CS8 required?").await.unwrap_err();
        assert!(err.to_string().starts_with("Could not reach the advising service"));
    }

    #[tokio::test]
    async fn test_ask_rejects_empty_question() {
        let client = AdvisorClient::new("http://127.0.0.1:9", None);
        assert!(ask(&client, "   ").await.is_err());
    }
}
