//! Terminal rendering of the feed and roster

use colored::Colorize;
use serde::Deserialize;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntryWire {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub note: String,
    pub joined_at: Option<i64>,
    pub service_start: Option<i64>,
    pub completed_at: Option<i64>,
    pub join_type: Option<String>,
    pub managers: Option<Vec<String>>,
    pub team_label: Option<String>,
    pub early_reason: Option<String>,
}

impl EntryWire {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryView {
    pub entry: EntryWire,
    #[serde(default)]
    pub avatar_codes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedView {
    pub location_id: Option<String>,
    pub region: Option<String>,
    pub queue: Vec<EntryView>,
    pub active: Vec<EntryView>,
    pub completed: Vec<EntryView>,
}

#[derive(Tabled)]
struct WaitingRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Guest")]
    name: String,
    #[tabled(rename = "Waiting")]
    waiting: String,
    #[tabled(rename = "Note")]
    note: String,
}

#[derive(Tabled)]
struct ServingRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Guest")]
    name: String,
    #[tabled(rename = "Type")]
    join_type: String,
    #[tabled(rename = "Team")]
    team: String,
    #[tabled(rename = "In service")]
    elapsed: String,
}

#[derive(Tabled)]
struct CompletedRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Guest")]
    name: String,
    #[tabled(rename = "Managers")]
    managers: String,
    #[tabled(rename = "Early")]
    early_reason: String,
}

/// Elapsed time as `Xm` or `Hh MMm`; "-" without a start
pub fn elapsed(since_millis: Option<i64>, now_millis: i64) -> String {
    let Some(since) = since_millis else {
        return "-".to_string();
    };
    let minutes = now_millis.saturating_sub(since).max(0) / 60_000;
    if minutes < 60 {
        format!("{}m", minutes)
    } else {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    }
}

fn or_dash(value: Option<String>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or_else(|| "-".to_string())
}

fn waiting_rows(feed: &FeedView, now: i64) -> Vec<WaitingRow> {
    feed.queue
        .iter()
        .enumerate()
        .map(|(i, view)| WaitingRow {
            position: i + 1,
            id: view.entry.id.clone(),
            name: view.entry.full_name(),
            waiting: elapsed(view.entry.joined_at, now),
            note: or_dash(Some(view.entry.note.clone())),
        })
        .collect()
}

fn serving_rows(feed: &FeedView, now: i64) -> Vec<ServingRow> {
    feed.active
        .iter()
        .map(|view| ServingRow {
            id: view.entry.id.clone(),
            name: view.entry.full_name(),
            join_type: or_dash(view.entry.join_type.clone()),
            team: match &view.entry.team_label {
                Some(label) => format!("{} [{}]", label, view.avatar_codes.join(" ")),
                None => "-".to_string(),
            },
            elapsed: elapsed(view.entry.service_start, now),
        })
        .collect()
}

fn completed_rows(feed: &FeedView) -> Vec<CompletedRow> {
    feed.completed
        .iter()
        .map(|view| CompletedRow {
            id: view.entry.id.clone(),
            name: view.entry.full_name(),
            managers: or_dash(view.entry.managers.as_ref().map(|m| m.join(", "))),
            early_reason: or_dash(view.entry.early_reason.clone()),
        })
        .collect()
}

pub fn print_feed(feed: &FeedView, store_label: &str, now_millis: i64) {
    let region = feed.region.as_deref().unwrap_or("?");
    println!(
        "{} {}",
        store_label.bold(),
        format!("({} / {})", feed.location_id.as_deref().unwrap_or("?"), region).dimmed()
    );

    println!("\n{} ({})", "Waiting".cyan().bold(), feed.queue.len());
    if feed.queue.is_empty() {
        println!("  {}", "No one waiting".dimmed());
    } else {
        println!("{}", Table::new(waiting_rows(feed, now_millis)));
    }

    println!("\n{} ({})", "In service".green().bold(), feed.active.len());
    if !feed.active.is_empty() {
        println!("{}", Table::new(serving_rows(feed, now_millis)));
    }

    println!("\n{} ({})", "Completed".blue().bold(), feed.completed.len());
    if !feed.completed.is_empty() {
        println!("{}", Table::new(completed_rows(feed)));
    }
}
