//! Terminal front end for the short-link session core.
//!
//! Drives the same state machine the web client uses, with a JSON file
//! standing in for browser storage so a token survives between invocations.
//! Navigations and notifications are printed instead of rendered.


use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use shortlink::api::{AuthApi, HttpAuthApi};
use shortlink::guard::{self, GuardDecision};
use shortlink::store::{ClientStore, JsonFileStore};
use shortlink::{Navigator, Notifier, Session, SessionConfig, SessionError, Severity};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("http client setup failed: {0}")]
    Api(#[from] shortlink::api::ApiError),
    #[error("state file unusable: {0}")]
    Store(#[from] shortlink::store::StoreError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("session verification did not finish within {0}s")]
    Timeout(u64),
}

#[derive(Parser, Debug)]
#[command(name = "shortlink-cli", about = "Short-link session CLI")]
struct Cli {
    #[arg(long, env = "SHORTLINK_API_BASE_URL", default_value = "http://127.0.0.1:5000")]
    base_url: String,

    #[arg(long, env = "SHORTLINK_STATE_FILE", default_value = ".shortlink-session.json")]
    state_file: PathBuf,

    /// Per-request timeout; also bounds startup verification.
    #[arg(long, env = "SHORTLINK_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify the stored token and report the resulting state.
    Status(StatusArgs),
    /// Exchange credentials for a token.
    Login(LoginArgs),
    /// Forget the stored token.
    Logout,
    /// Visit a path and report what the route guard decides.
    Visit(VisitArgs),
}

#[derive(Args, Debug)]
struct StatusArgs {
    #[arg(long, default_value = "/")]
    path: String,
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "SHORTLINK_PASSWORD")]
    password: String,
}

#[derive(Args, Debug)]
struct VisitArgs {
    path: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = SessionConfig::new(&cli.base_url).with_request_timeout_secs(cli.request_timeout_secs);
    let session = build_session(&config, &cli.state_file)?;
    tracing::debug!(base_url = %config.api_base_url, state_file = %cli.state_file.display(), "session ready");

    match cli.command {
        Command::Status(args) => {
            let status = initialize(&session, &args.path, config.request_timeout_secs).await?;
            println!("status: {status:?}");
        }
        Command::Login(args) => {
            initialize(&session, &config.paths.login, config.request_timeout_secs).await?;
            session.login(&args.email, &args.password).await?;
        }
        Command::Logout => session.logout().await,
        Command::Visit(args) => {
            initialize(&session, &args.path, config.request_timeout_secs).await?;
            println!("{}", visit(&session, &args.path));
        }
    }
    session.close();
    Ok(())
}

fn build_session(config: &SessionConfig, state_file: &Path) -> Result<Session, CliError> {
    let api: Rc<dyn AuthApi> = Rc::new(HttpAuthApi::new(config)?);
    let store: Rc<dyn ClientStore> = Rc::new(JsonFileStore::open(state_file)?);
    let navigator: Rc<dyn Navigator> = Rc::new(|path: &str| println!("-> {path}"));
    let notifier: Rc<dyn Notifier> =
        Rc::new(|message: &str, severity: Severity| println!("{}", format_notice(message, severity)));
    Ok(Session::new(config.paths.clone(), api, store, navigator, notifier))
}

/// Run startup verification, bounded by `timeout_secs` when given.
async fn initialize(
    session: &Session,
    path: &str,
    timeout_secs: Option<u64>,
) -> Result<shortlink::SessionStatus, CliError> {
    let Some(secs) = timeout_secs else {
        return Ok(session.initialize(path).await?);
    };
    match tokio::time::timeout(Duration::from_secs(secs), session.initialize(path)).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            session.close();
            Err(CliError::Timeout(secs))
        }
    }
}

/// Apply the guard to `path` and record where the user actually lands.
///
/// A redirect means the login view is what gets shown, so that path is
/// tracked instead of the protected one.
fn visit(session: &Session, path: &str) -> String {
    let decision = guard::decide(&session.snapshot(), session.paths());
    let landed = match &decision {
        GuardDecision::Redirect { to, .. } => to.as_str(),
        GuardDecision::Render | GuardDecision::Loading => path,
    };
    session.track_route(landed);
    describe_decision(path, &decision)
}

fn format_notice(message: &str, severity: Severity) -> String {
    format!("[{severity}] {message}")
}

fn describe_decision(path: &str, decision: &GuardDecision) -> String {
    match decision {
        GuardDecision::Render => format!("{path}: render"),
        GuardDecision::Loading => format!("{path}: waiting for verification"),
        GuardDecision::Redirect { to, .. } => format!("{path}: redirect to {to}"),
    }
}
