//! Subcommand implementations.
//!
//! Each command resolves the target session, checks that the requested
//! action is currently legal, submits it through the controller, and
//! either waits for the transition or returns after submission
//! (`--no-wait`). Destructive commands run the unsaved-work check and
//! prompt before submitting unless `--yes` is given.

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use wsctl_api::SessionCreateRequest;
use wsctl_client::{SessionAction, SessionController, StatusPoller, WaitHandle, WaitOutcome};
use wsctl_core::{Session, SessionName};

use crate::config::{self, Config, ENV_API_TOKEN, ENV_API_URL};
use crate::output;

/// Lists the user's sessions.
pub async fn list(controller: &SessionController) -> Result<()> {
    let sessions = controller.sessions().await?;
    print!("{}", output::session_table(&sessions));
    Ok(())
}

/// Shows the detail view for one session.
pub async fn show(controller: &SessionController, name: &SessionName) -> Result<()> {
    let session = controller.require_session(name).await?;
    print!("{}", output::session_details(&session));
    Ok(())
}

/// Creates a session and waits for it to come up.
pub async fn start(
    controller: &SessionController,
    request: SessionCreateRequest,
    no_wait: bool,
) -> Result<()> {
    let (session, handle) = controller.launch(&request).await?;
    println!("Session {} created.", session.name);
    finish_wait(handle, no_wait, "come up").await
}

/// Pauses a running session after the unsaved-work confirmation.
pub async fn pause(
    controller: &SessionController,
    name: &SessionName,
    yes: bool,
    no_wait: bool,
) -> Result<()> {
    let session = controller.require_session(name).await?;
    ensure_action(controller, &session, SessionAction::Pause)?;
    if !yes && !confirm_destructive(controller, &session, "Pause").await? {
        println!("Aborted.");
        return Ok(());
    }

    let handle = controller.pause(name).await?;
    println!("Pause requested for {name}.");
    finish_wait(handle, no_wait, "pause").await
}

/// Resumes a hibernated session.
pub async fn resume(
    controller: &SessionController,
    name: &SessionName,
    no_wait: bool,
) -> Result<()> {
    let session = controller.require_session(name).await?;
    ensure_action(controller, &session, SessionAction::Resume)?;

    let handle = controller.resume(name).await?;
    println!("Resume requested for {name}.");
    finish_wait(handle, no_wait, "come up").await
}

/// Changes a session's resource class, optionally resuming it after.
pub async fn modify(
    controller: &SessionController,
    name: &SessionName,
    resource_class_id: u32,
    resume_after: bool,
    no_wait: bool,
) -> Result<()> {
    let session = controller.require_session(name).await?;
    ensure_action(controller, &session, SessionAction::Modify)?;

    match controller
        .modify(&session, resource_class_id, resume_after)
        .await?
    {
        Some(handle) => {
            println!("Resource class change to {resource_class_id} submitted for {name}.");
            finish_wait(handle, no_wait, "come up").await
        }
        None => {
            println!("Resource class changed to {resource_class_id}; session remains paused.");
            Ok(())
        }
    }
}

/// Deletes a session after the unsaved-work confirmation.
pub async fn stop(
    controller: &SessionController,
    name: &SessionName,
    yes: bool,
    no_wait: bool,
) -> Result<()> {
    let session = controller.require_session(name).await?;
    ensure_action(controller, &session, SessionAction::Stop)?;
    if !yes && !confirm_destructive(controller, &session, "Delete").await? {
        println!("Aborted.");
        return Ok(());
    }

    let handle = controller.stop(name).await?;
    println!("Delete requested for {name}.");
    finish_wait(handle, no_wait, "shut down").await
}

/// Prints recent container logs.
pub async fn logs(
    controller: &SessionController,
    name: &SessionName,
    tail: Option<u32>,
) -> Result<()> {
    let text = controller.logs(name, tail).await?;
    print!("{text}");
    Ok(())
}

/// Prints the URL of a running session.
pub async fn open(controller: &SessionController, name: &SessionName) -> Result<()> {
    let session = controller.require_session(name).await?;
    if !session.state().is_running() {
        bail!(
            "session {} is {}; only running sessions can be opened",
            name,
            session.state().label().to_lowercase()
        );
    }
    if session.url.is_empty() {
        bail!("session {name} has no URL yet");
    }
    println!("{}", session.url);
    Ok(())
}

/// Prints the effective configuration and where each piece may come from.
pub fn show_config(effective: &Config) {
    match config::config_path() {
        Some(path) if path.exists() => println!("Config file:   {}", path.display()),
        Some(path) => println!("Config file:   {} (not present)", path.display()),
        None => println!("Config file:   (no config directory)"),
    }

    let api = effective.api_config();
    println!("API URL:       {}  (override: {ENV_API_URL})", api.base_url);
    let token = if api.token.is_some() {
        "(set)"
    } else {
        "(not set)"
    };
    println!("API token:     {token}  (override: {ENV_API_TOKEN})");

    let interval = effective
        .poll_interval_ms
        .unwrap_or(StatusPoller::DEFAULT_INTERVAL.as_millis() as u64);
    println!("Poll interval: {interval} ms");
}

// ============================================================================
// Helpers
// ============================================================================

/// Fails with a state-appropriate message when `action` is not currently
/// legal for the session.
fn ensure_action(
    controller: &SessionController,
    session: &Session,
    action: SessionAction,
) -> Result<()> {
    if !controller.actions(Some(session)).contains(&action) {
        bail!(
            "session {} is {}; {} is not available",
            session.name,
            session.state().label().to_lowercase(),
            action.label().to_lowercase()
        );
    }
    Ok(())
}

/// Runs the unsaved-work check and asks for confirmation.
async fn confirm_destructive(
    controller: &SessionController,
    session: &Session,
    verb: &str,
) -> Result<bool> {
    if let Some(warning) = controller.unsaved_work(session).await {
        println!("Warning: the session may contain {}.", warning.detail());
    }
    confirm(&format!("{verb} session {}?", session.name))
}

/// Prompts on stdout, reads one line, accepts only an explicit yes.
fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut answer = String::new();
    io::stdin()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "Yes" | "YES"))
}

/// Resolves a mutation's wait per the wait policy.
async fn finish_wait(mut handle: WaitHandle, no_wait: bool, goal: &str) -> Result<()> {
    if no_wait {
        handle.skip();
        return Ok(());
    }

    match handle.wait().await {
        WaitOutcome::Reached(state) => {
            println!("Session is now {}.", state.label().to_lowercase());
            Ok(())
        }
        WaitOutcome::Gone => {
            println!("Session deleted.");
            Ok(())
        }
        WaitOutcome::Vanished => {
            bail!("session disappeared while waiting for it to {goal}")
        }
        WaitOutcome::TimedOut => bail!(
            "timed out waiting for the session to {goal}; run `wsctl list` to check its state"
        ),
        WaitOutcome::Cancelled => bail!("the wait was cancelled before the session could {goal}"),
    }
}
