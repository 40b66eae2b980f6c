//! Plain-text rendering for list and show output.

use std::collections::HashMap;
use wsctl_core::{assess_unsaved_work, format_age, Session};

/// Renders the session list as an aligned table, sorted by name.
pub fn session_table(sessions: &HashMap<String, Session>) -> String {
    if sessions.is_empty() {
        return "No sessions.\n".to_string();
    }

    let mut names: Vec<&String> = sessions.keys().collect();
    names.sort();

    let mut out = format!(
        "{:<34} {:<14} {:>5}  {:>5}  {}\n",
        "NAME", "STATE", "READY", "AGE", "RESOURCES"
    );
    for name in names {
        if let Some(session) = sessions.get(name) {
            out.push_str(&session_row(session));
            out.push('\n');
        }
    }
    out
}

/// Renders one table row.
pub fn session_row(session: &Session) -> String {
    let state = session.state();
    format!(
        "{:<34} {:<14} {:>5}  {:>5}  {}",
        session.name.as_str(),
        format!("{} {}", state.icon(), state.label()),
        session.status.readiness(),
        format_age(session.age()),
        session.resources.requests.format(),
    )
}

/// Renders the full detail view for one session.
pub fn session_details(session: &Session) -> String {
    let state = session.state();
    let annotations = &session.annotations;

    let mut out = String::new();
    out.push_str(&format!("Name:       {}\n", session.name));
    out.push_str(&format!(
        "State:      {} {} ({} ready)\n",
        state.icon(),
        state.label(),
        session.status.readiness()
    ));
    if let Some(message) = &session.status.message {
        out.push_str(&format!("Message:    {message}\n"));
    }
    if !annotations.project.is_empty() {
        out.push_str(&format!(
            "Project:    {}/{} @ {} ({})\n",
            annotations.namespace,
            annotations.project,
            annotations.branch,
            short_commit(&annotations.commit_sha)
        ));
    }
    if !session.image.is_empty() {
        out.push_str(&format!("Image:      {}\n", session.image));
    }
    out.push_str(&format!(
        "Resources:  {}\n",
        session.resources.requests.format()
    ));
    out.push_str(&format!("Age:        {}\n", format_age(session.age())));
    if state.is_running() && !session.url.is_empty() {
        out.push_str(&format!("URL:        {}\n", session.url));
    }

    if state.is_hibernated() {
        if let Some(expires) = annotations.expires_at() {
            out.push_str(&format!(
                "Kept until: {}\n",
                expires.format("%Y-%m-%d %H:%M UTC")
            ));
        }
        if let Some(warning) = assess_unsaved_work(session, None) {
            out.push_str(&format!("Unsaved:    {}\n", warning.detail()));
        }
    }

    if !session.status.details.is_empty() {
        out.push_str("Steps:\n");
        for step in &session.status.details {
            out.push_str(&format!("  [{}] {}\n", step.status, step.step));
        }
    }
    out
}

fn short_commit(sha: &str) -> &str {
    let end = sha
        .char_indices()
        .nth(7)
        .map_or(sha.len(), |(index, _)| index);
    &sha[..end]
}
