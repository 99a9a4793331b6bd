//! Operator commands typed at the prompt.

use mesh_core::Connection;
use shared::types::TaskId;
use task_board::render::{render_board, render_notice};
use task_board::{Notice, ProtocolEngine, Role, TaskBoardError, TaskStore};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Post { title: String, description: String },
    Claim(TaskId),
    Done(TaskId),
    List,
    Quit,
    Usage(&'static str),
    Unknown,
}

pub enum Flow {
    Continue(String),
    Quit,
}

pub fn help(role: Role) -> &'static str {
    match role {
        Role::Admin => "Commands: [post] <title> | <description>   [list]   [quit]",
        Role::Worker => "Commands: [claim] <task-id>   [done] <task-id>   [list]   [quit]",
    }
}

/// Help line followed by the input marker.
pub fn prompt(role: Role) -> String {
    format!("{}\n> ", help(role))
}

/// Text shown for a peer event: the notice, then the board and a fresh
/// prompt when the board changed and the operator is at the prompt.
pub fn show_notice(notice: &Notice, store: &TaskStore, role: Role, prompting: bool) -> String {
    let mut out = format!("{}\n", render_notice(notice));
    if notice.changes_board() {
        out.push_str(&render_board(store));
        if prompting {
            out.push_str(&prompt(role));
        }
    }
    out
}

pub fn parse(input: &str, role: Role) -> Command {
    let line = input.trim();
    match line {
        "list" => return Command::List,
        "quit" => return Command::Quit,
        "claim" if role == Role::Worker => return Command::Usage("Usage: claim <task-id>"),
        "done" if role == Role::Worker => return Command::Usage("Usage: done <task-id>"),
        _ => {}
    }

    match role {
        Role::Admin => {
            if let Some(rest) = line.strip_prefix("post ") {
                let (title, description) = match rest.split_once('|') {
                    Some((title, description)) => (title.trim(), description.trim()),
                    None => (rest.trim(), ""),
                };
                if title.is_empty() {
                    return Command::Usage("Usage: post <title> | <description>");
                }
                return Command::Post {
                    title: title.to_string(),
                    description: description.to_string(),
                };
            }
        }
        Role::Worker => {
            if let Some(rest) = line.strip_prefix("claim ") {
                return Command::Claim(TaskId::new(rest.trim()));
            }
            if let Some(rest) = line.strip_prefix("done ") {
                return Command::Done(TaskId::new(rest.trim()));
            }
        }
    }
    Command::Unknown
}

pub fn execute<C: Connection>(engine: &mut ProtocolEngine<C>, command: Command) -> Flow {
    let output = match command {
        Command::List => render_board(engine.store()),
        Command::Quit => return Flow::Quit,
        Command::Usage(usage) => usage.to_string(),
        Command::Unknown => "Unknown command.".to_string(),
        Command::Post { title, description } => match engine.post_task(&title, &description) {
            Ok(task) => format!("\n[POSTED] \"{}\" ({}){}", task.title, task.id, render_board(engine.store())),
            Err(e) => failed(e),
        },
        Command::Claim(task_id) => match engine.claim_task(task_id.clone()) {
            Ok(_) => format!("[SENT] Claim request for {}", task_id),
            Err(e) => failed(e),
        },
        Command::Done(task_id) => match engine.complete_task(task_id.clone()) {
            Ok(_) => format!("[SENT] Completion notice for {}", task_id),
            Err(e) => failed(e),
        },
    };
    Flow::Continue(output)
}

fn failed(e: TaskBoardError) -> String {
    warn!("Command failed: {}", e);
    format!("[!] {}", e)
}
