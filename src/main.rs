use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use health_harbor_lib::api::{auth, ApiConfig};
use health_harbor_lib::commands::chat::{resume_session, send_message, ChatError};
use health_harbor_lib::commands::settings;
use health_harbor_lib::render::{render_message, render_parsed};
use health_harbor_lib::{parse_response, Session};
use std::io::Read;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(
    name = "health-harbor",
    about = "Health Harbor AI chat client",
    version,
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to config file (layered over the discovered ones)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Orchestrator base URL, e.g. "http://localhost:8001"
    #[arg(long, global = true)]
    api_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split an assistant reply into summary / recommendations / disclaimer
    Parse {
        /// File holding the reply; stdin when omitted
        file: Option<PathBuf>,
        /// Print the sections as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign in. Prints a masked token unless --print-token is given
    Login {
        #[arg(long)]
        email: Option<String>,
        #[arg(long, env = "HEALTH_HARBOR_PASSWORD", hide_env_values = true)]
        password: String,
        /// Print only the full bearer token, for `chat --token` or
        /// HEALTH_HARBOR_TOKEN
        #[arg(long)]
        print_token: bool,
    },
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "HEALTH_HARBOR_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        full_name: String,
    },
    /// Chat with the assistant; reads one message per line from stdin unless
    /// --message is given
    Chat {
        #[arg(long)]
        email: Option<String>,
        #[arg(long, env = "HEALTH_HARBOR_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Reuse an existing bearer token instead of signing in
        #[arg(long, env = "HEALTH_HARBOR_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Send a single message and exit
        #[arg(long, short = 'm')]
        message: Option<String>,
        /// Continue an earlier session, loading its history from the server
        #[arg(long, value_name = "SESSION_ID")]
        resume: Option<String>,
        /// Maximum number of messages to load with --resume
        #[arg(long, requires = "resume")]
        history_limit: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = settings::load(cli.config.as_deref()).context("loading settings")?;
    if let Some(url) = cli.api_url {
        settings.api_base_url = url;
    }
    let config = settings.api_config();

    match cli.command {
        Command::Parse { file, json } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("reading stdin")?;
                    buf
                }
            };
            let parsed = parse_response(&text);
            if json {
                println!("{}", serde_json::to_string_pretty(&parsed)?);
            } else {
                println!("{}", render_parsed(&parsed));
            }
        }
        Command::Login {
            email,
            password,
            print_token,
        } => {
            let email = email
                .or(settings.email)
                .context("no email given (use --email or set `email` in the config)")?;
            let mut session = Session::new();
            session.sign_in(auth::login(&config, &email, &password).await?);
            println!("{}", login_line(&session, &email, print_token));
        }
        Command::Register {
            email,
            password,
            full_name,
        } => {
            let resp = auth::register(&config, &email, &password, &full_name).await?;
            println!("{} ({})", resp.message, resp.user.email);
        }
        Command::Chat {
            email,
            password,
            token,
            message,
            resume,
            history_limit,
        } => {
            let mut session =
                open_session(&config, email.or(settings.email), password, token).await?;
            if let Some(session_id) = resume {
                let count = resume_session(&config, &mut session, &session_id, history_limit)
                    .await
                    .with_context(|| format!("resuming session {}", session_id))?;
                if message.is_none() {
                    for earlier in session.messages().iter().skip(1) {
                        println!("{}\n", render_message(earlier));
                    }
                }
                eprintln!("Resumed {} message(s) from session {}", count, session_id);
            }
            match message {
                Some(message) => chat_once(&config, &mut session, &message).await?,
                None => repl(&config, &mut session).await?,
            }
        }
    }

    Ok(())
}

async fn open_session(
    config: &ApiConfig,
    email: Option<String>,
    password: Option<String>,
    token: Option<String>,
) -> Result<Session> {
    if let Some(token) = token {
        return Ok(Session::with_token(token));
    }
    match (email, password) {
        (Some(email), Some(password)) => {
            let mut session = Session::new();
            session.sign_in(
                auth::login(config, &email, &password)
                    .await
                    .context("login failed")?,
            );
            Ok(session)
        }
        _ => bail!("chat needs --token, or --email and --password"),
    }
}

/// What `login` prints: the bare token when it is meant to be reused,
/// otherwise a greeting with the token masked.
fn login_line(session: &Session, email: &str, print_token: bool) -> String {
    if print_token {
        session.token().unwrap_or_default().to_string()
    } else {
        format!(
            "Logged in as {} (token {}); use --print-token to reuse it",
            email,
            session.masked_token().unwrap_or_default()
        )
    }
}

async fn chat_once(config: &ApiConfig, session: &mut Session, message: &str) -> Result<()> {
    match send_message(config, session, message).await {
        Ok(reply) => println!("{}", render_message(reply)),
        Err(ChatError::EmptyMessage) => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn repl(config: &ApiConfig, session: &mut Session) -> Result<()> {
    if let Some(greeting) = session.messages().first() {
        println!("{}\n", render_message(greeting));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/logout" => {
                session.logout();
                println!("Signed out.");
                break;
            }
            "" => continue,
            text => {
                println!("Health Harbor AI is thinking...");
                chat_once(config, session, text).await?;
                println!();
            }
        }
    }
    Ok(())
}
