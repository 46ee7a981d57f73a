//! Queueline CLI
//! Staff-facing client for the queue daemon over JSON-RPC

mod prefs;
mod render;
mod rpc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use tabled::{Table, Tabled};

use crate::prefs::{Preferences, Role};
use crate::render::FeedView;
use crate::rpc::RpcClient;

#[derive(Parser)]
#[command(name = "queueline-cli")]
#[command(about = "Walk-in queue CLI", long_about = None)]
struct Cli {
    /// RPC server URL
    #[arg(long, env = "QUEUELINE_RPC_URL", default_value = "http://127.0.0.1:9630")]
    rpc_url: String,

    /// Preferences file (defaults to the user config directory)
    #[arg(long, env = "QUEUELINE_PREFS")]
    prefs: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the waiting, in-service and completed lists
    Show,
    /// Add a guest to the end of the line
    Add {
        first_name: String,
        #[arg(default_value = "")]
        last_name: String,
        #[arg(short, long, default_value = "")]
        note: String,
    },
    /// Start serving a waiting guest
    Begin {
        entry_id: String,
        /// Guest has an appointment (default: walk-in)
        #[arg(long)]
        appointment: bool,
    },
    /// Return a guest in service to the waiting list
    SendBack {
        entry_id: String,
        /// Try to return to the slot held before service
        #[arg(long)]
        original: bool,
        #[command(flatten)]
        managers: ManagerArgs,
    },
    /// Finish a visit; the guest rejoins the line
    Complete {
        entry_id: String,
        /// Rejoin at the slot held before service
        #[arg(long)]
        original: bool,
        /// Why the guest returns early (service, parts, finance, other)
        #[arg(long)]
        reason: Option<String>,
        #[command(flatten)]
        managers: ManagerArgs,
    },
    /// Delete a waiting entry (owner/admin)
    Remove { entry_id: String },
    /// Delete a completed record (owner/admin)
    RemoveCompleted { entry_id: String },
    /// Empty the waiting list (owner/admin)
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Set or clear the team label of a guest in service
    Team {
        entry_id: String,
        /// Omit to clear
        label: Vec<String>,
    },
    /// Manager roster
    Managers {
        #[command(subcommand)]
        action: Option<ManagersAction>,
    },
    /// Saved guest names
    Names {
        #[command(subcommand)]
        action: Option<NamesAction>,
    },
    /// Switch the daemon to another region's feed
    Region { name: String },
    /// Local device preferences
    Prefs {
        #[command(subcommand)]
        action: Option<PrefsAction>,
    },
}

#[derive(clap::Args)]
struct ManagerArgs {
    /// Roster manager id (repeatable)
    #[arg(long = "manager-id")]
    manager_ids: Vec<String>,
    /// Free-text manager name, added to the roster if new
    #[arg(long = "manager")]
    typed_name: Option<String>,
}

impl ManagerArgs {
    fn to_json(&self) -> Value {
        json!({
            "selected_ids": self.manager_ids,
            "typed_name": self.typed_name,
        })
    }
}

#[derive(Subcommand)]
enum ManagersAction {
    List,
    Add { name: Vec<String> },
}

#[derive(Subcommand)]
enum NamesAction {
    List,
    Add {
        first_name: String,
        #[arg(default_value = "")]
        last_name: String,
    },
    Remove { id: String },
}

#[derive(Subcommand)]
enum PrefsAction {
    Show,
    Set {
        #[arg(long, value_enum)]
        role: Option<Role>,
        #[arg(long)]
        store_label: Option<String>,
        #[arg(long)]
        show_clock: Option<bool>,
    },
}

#[derive(Deserialize)]
struct ManagerWire {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct ManagersWire {
    managers: Vec<ManagerWire>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavedNameWire {
    id: String,
    first_name: String,
    last_name: String,
}

#[derive(Deserialize)]
struct SavedNamesWire {
    names: Vec<SavedNameWire>,
}

#[derive(Tabled)]
struct RosterRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
}

/// One-line summary of a `CommandOutcome`; `Err` carries the skip reason
fn describe_outcome(outcome: &Value) -> std::result::Result<String, String> {
    let kind = outcome["outcome"].as_str().unwrap_or_default();
    let entry = outcome["entry_id"].as_str().unwrap_or_default();
    match kind {
        "skipped" => Err(outcome["reason"].as_str().unwrap_or("no change").to_string()),
        "enqueued" => Ok(format!(
            "Added {} ({})",
            outcome["entry"]["firstName"].as_str().unwrap_or_default(),
            outcome["entry"]["id"].as_str().unwrap_or_default()
        )),
        "service_begun" => Ok(format!("Serving {}", entry)),
        "sent_back" => Ok(format!(
            "Sent {} back to {} (slot {})",
            entry,
            outcome["placement"]["position"].as_str().unwrap_or("bottom"),
            outcome["placement"]["index"].as_u64().unwrap_or_default() + 1
        )),
        "completed" => Ok(format!(
            "Completed {}; rejoined at {} (slot {})",
            outcome["visit"]["completed_id"].as_str().unwrap_or_default(),
            outcome["visit"]["placement"]["position"].as_str().unwrap_or("bottom"),
            outcome["visit"]["placement"]["index"].as_u64().unwrap_or_default() + 1
        )),
        "removed" => Ok(format!("Removed {}", entry)),
        "cleared" => Ok(format!(
            "Cleared {} waiting",
            outcome["removed"].as_u64().unwrap_or_default()
        )),
        "team_label_set" => Ok(format!("Team label updated for {}", entry)),
        "region_switched" => Ok(format!(
            "Now showing region {}",
            outcome["key"]["region"].as_str().unwrap_or_default()
        )),
        other => Ok(format!("Done ({})", other)),
    }
}

fn print_outcome(outcome: &Value) {
    match describe_outcome(outcome) {
        Ok(line) => println!("{}", format!("✓ {}", line).green().bold()),
        Err(reason) => println!("{}", format!("• Skipped: {}", reason).yellow()),
    }
}

fn require_admin(prefs: &Preferences, action: &str) -> Result<()> {
    if !prefs.role.is_admin_like() {
        bail!("{} requires the owner or admin role (current: {})", action, prefs.role);
    }
    Ok(())
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let prefs_path = match cli.prefs {
        Some(path) => path,
        None => Preferences::default_path()?,
    };
    let mut prefs = Preferences::load(&prefs_path)?;
    let client = RpcClient::new(&cli.rpc_url);

    match cli.command {
        Commands::Show => {
            let feed: FeedView = client.call("feed.get.v1", json!({})).await?;
            if prefs.show_clock {
                println!("{}", chrono::Local::now().format("%H:%M").to_string().dimmed());
            }
            if let (Some(wanted), Some(current)) = (&prefs.region, &feed.region) {
                if wanted != current {
                    println!(
                        "{}",
                        format!("Daemon is on region {}, this device last chose {}", current, wanted)
                            .yellow()
                    );
                }
            }
            render::print_feed(&feed, &prefs.store_label, now_millis());
        }

        Commands::Add {
            first_name,
            last_name,
            note,
        } => {
            let outcome: Value = client
                .call(
                    "queue.enqueue.v1",
                    json!({"first_name": first_name, "last_name": last_name, "note": note}),
                )
                .await?;
            print_outcome(&outcome);
        }

        Commands::Begin {
            entry_id,
            appointment,
        } => {
            let join_type = if appointment { "appointment" } else { "walk-in" };
            let outcome: Value = client
                .call(
                    "queue.begin_service.v1",
                    json!({"entry_id": entry_id, "join_type": join_type}),
                )
                .await?;
            print_outcome(&outcome);
        }

        Commands::SendBack {
            entry_id,
            original,
            managers,
        } => {
            let position = if original { "original" } else { "bottom" };
            let outcome: Value = client
                .call(
                    "queue.send_back.v1",
                    json!({"entry_id": entry_id, "position": position, "managers": managers.to_json()}),
                )
                .await?;
            print_outcome(&outcome);
        }

        Commands::Complete {
            entry_id,
            original,
            reason,
            managers,
        } => {
            let position = if original { "original" } else { "bottom" };
            let outcome: Value = client
                .call(
                    "queue.complete_visit.v1",
                    json!({
                        "entry_id": entry_id,
                        "position": position,
                        "early_reason": reason.map(|r| r.to_lowercase()),
                        "managers": managers.to_json(),
                    }),
                )
                .await?;
            print_outcome(&outcome);
        }

        Commands::Remove { entry_id } => {
            require_admin(&prefs, "remove")?;
            let outcome: Value = client
                .call("queue.remove.v1", json!({"entry_id": entry_id}))
                .await?;
            print_outcome(&outcome);
        }

        Commands::RemoveCompleted { entry_id } => {
            require_admin(&prefs, "remove-completed")?;
            let outcome: Value = client
                .call("completed.remove.v1", json!({"entry_id": entry_id}))
                .await?;
            print_outcome(&outcome);
        }

        Commands::Clear { yes } => {
            require_admin(&prefs, "clear")?;
            if !yes {
                bail!("Refusing to clear the waiting list without --yes");
            }
            let outcome: Value = client.call("queue.clear.v1", json!({})).await?;
            print_outcome(&outcome);
        }

        Commands::Team { entry_id, label } => {
            let outcome: Value = client
                .call(
                    "active.team_label.v1",
                    json!({"entry_id": entry_id, "label": label.join(" ")}),
                )
                .await?;
            print_outcome(&outcome);
        }

        Commands::Managers { action } => match action.unwrap_or(ManagersAction::List) {
            ManagersAction::List => {
                let roster: ManagersWire = client.call("roster.managers.list.v1", json!({})).await?;
                let rows: Vec<RosterRow> = roster
                    .managers
                    .into_iter()
                    .map(|m| RosterRow { id: m.id, name: m.name })
                    .collect();
                println!("{}", Table::new(rows));
            }
            ManagersAction::Add { name } => {
                let added: Value = client
                    .call("roster.managers.add.v1", json!({"name": name.join(" ")}))
                    .await?;
                match added["manager"]["name"].as_str() {
                    Some(name) => println!("{}", format!("✓ Manager: {}", name).green().bold()),
                    None => println!("{}", "• Skipped: blank name".yellow()),
                }
            }
        },

        Commands::Names { action } => match action.unwrap_or(NamesAction::List) {
            NamesAction::List => {
                let saved: SavedNamesWire = client.call("roster.names.list.v1", json!({})).await?;
                let rows: Vec<RosterRow> = saved
                    .names
                    .into_iter()
                    .map(|n| RosterRow {
                        id: n.id,
                        name: format!("{} {}", n.first_name, n.last_name).trim().to_string(),
                    })
                    .collect();
                println!("{}", Table::new(rows));
            }
            NamesAction::Add {
                first_name,
                last_name,
            } => {
                let added: Value = client
                    .call(
                        "roster.names.add.v1",
                        json!({"first_name": first_name, "last_name": last_name}),
                    )
                    .await?;
                match added["saved_name"]["id"].as_str() {
                    Some(id) => println!("{}", format!("✓ Saved name {}", id).green().bold()),
                    None => println!("{}", "• Skipped: blank name".yellow()),
                }
            }
            NamesAction::Remove { id } => {
                let removed: Value = client
                    .call("roster.names.remove.v1", json!({"id": id}))
                    .await?;
                if removed["removed"].as_bool().unwrap_or(false) {
                    println!("{}", "✓ Saved name removed".green().bold());
                } else {
                    println!("{}", "• Skipped: no such saved name".yellow());
                }
            }
        },

        Commands::Region { name } => {
            let outcome: Value = client
                .call("feed.switch_region.v1", json!({"region": name}))
                .await?;
            print_outcome(&outcome);
            prefs.region = Some(name.trim().to_string());
            prefs.save(&prefs_path)?;
        }

        Commands::Prefs { action } => match action.unwrap_or(PrefsAction::Show) {
            PrefsAction::Show => {
                println!("{}", serde_json::to_string_pretty(&prefs)?);
                println!("{}", format!("({})", prefs_path.display()).dimmed());
            }
            PrefsAction::Set {
                role,
                store_label,
                show_clock,
            } => {
                if let Some(role) = role {
                    prefs.role = role;
                }
                if let Some(label) = store_label {
                    prefs.store_label = label;
                }
                if let Some(show) = show_clock {
                    prefs.show_clock = show;
                }
                prefs.save(&prefs_path)?;
                println!("{}", "✓ Preferences saved".green().bold());
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_outcomes() {
        let completed = json!({
            "outcome": "completed",
            "visit": {"completed_id": "e-1", "requeued_id": "e-2",
                      "placement": {"position": "original", "index": 0}}
        });
        assert_eq!(
            describe_outcome(&completed).unwrap(),
            "Completed e-1; rejoined at original (slot 1)"
        );

        let skipped = json!({"outcome": "skipped", "reason": "entry e-9 is not in service"});
        assert_eq!(describe_outcome(&skipped).unwrap_err(), "entry e-9 is not in service");

        let cleared = json!({"outcome": "cleared", "removed": 4});
        assert_eq!(describe_outcome(&cleared).unwrap(), "Cleared 4 waiting");
    }

    #[test]
    fn test_admin_gate() {
        let mut prefs = Preferences::default();
        assert!(require_admin(&prefs, "clear").is_err());
        prefs.role = Role::Owner;
        assert!(require_admin(&prefs, "clear").is_ok());
    }

    #[test]
    fn test_manager_args_wire_shape() {
        let args = ManagerArgs {
            manager_ids: vec!["m1".to_string()],
            typed_name: Some("Sam Ho".to_string()),
        };
        assert_eq!(
            args.to_json(),
            json!({"selected_ids": ["m1"], "typed_name": "Sam Ho"})
        );
    }

    #[test]
    fn test_cli_parses_complete() {
        let cli = Cli::try_parse_from([
            "queueline-cli", "complete", "e-1", "--original", "--reason", "parts", "--manager", "Sam",
        ])
        .unwrap();
        match cli.command {
            Commands::Complete {
                entry_id,
                original,
                reason,
                managers,
            } => {
                assert_eq!(entry_id, "e-1");
                assert!(original);
                assert_eq!(reason.as_deref(), Some("parts"));
                assert_eq!(managers.typed_name.as_deref(), Some("Sam"));
            }
            _ => panic!("expected complete"),
        }
    }
}
