//! Console rendering of the board and of engine notices.

use crate::engine::Notice;
use crate::store::TaskStore;
use shared::types::TaskStatus;
use std::fmt::Write;

const RULE: &str = "─────────────────────────────────────────────────";

fn marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Open => "🟡",
        TaskStatus::Claimed => "🔵",
        TaskStatus::Done => "✅",
    }
}

pub fn render_board(store: &TaskStore) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n── TaskRelay Board ──────────────────────────────");
    if store.is_empty() {
        let _ = writeln!(out, "  (no tasks yet)");
    }
    for task in store.list() {
        let _ = writeln!(out, "  {} [{}] {} — {}", marker(task.status), task.id, task.title, task.status);
        if let Some(peer) = &task.claimed_by {
            let _ = writeln!(out, "       Claimed by: {}", peer);
        }
        if let Some(at) = &task.completed_at {
            let _ = writeln!(out, "       Completed : {}", at.to_rfc3339());
        }
    }
    if !store.is_empty() {
        let stats = store.stats();
        let count = |status: TaskStatus| stats.get(&status).copied().unwrap_or(0);
        let _ = writeln!(
            out,
            "  {} open / {} claimed / {} done",
            count(TaskStatus::Open),
            count(TaskStatus::Claimed),
            count(TaskStatus::Done)
        );
    }
    let _ = writeln!(out, "{}", RULE);
    out
}

pub fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::PeerJoined(peer) => format!("\n[+] Peer connected: {}", peer),
        Notice::PeerLeft(peer) => format!("\n[-] Peer disconnected: {}", peer),
        Notice::Claimed(task) => format!(
            "\n[CLAIM] Task \"{}\" claimed by {}",
            task.title,
            task.claimed_by.as_ref().map(|p| p.as_str()).unwrap_or("?")
        ),
        Notice::Completed(task) => format!(
            "\n[DONE] Task \"{}\" completed by {}!",
            task.title,
            task.claimed_by.as_ref().map(|p| p.as_str()).unwrap_or("?")
        ),
        Notice::Synced(count) => format!("\n[SYNC] Task board received ({} task(s)):", count),
        Notice::Updated(task) => format!("\n[UPDATE] Task updated: {} → {}", task.id, task.status),
        Notice::Posted(task) => format!("\n[NEW] New task posted: \"{}\"", task.title),
        Notice::Rejected(message) => format!("\n[ERROR] {}", message),
    }
}
