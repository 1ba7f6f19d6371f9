//! Module inspection commands: discover, probe, check, snapshot.

use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde::Serialize;

use trainerbot_core::backend::ModuleBackend;
use trainerbot_core::discovery::contract::{ContractCheck, StepResult, check_registry};
use trainerbot_core::discovery::prober::{EndpointProber, probe_candidates};
use trainerbot_types::module::{ModuleBinding, ModuleVersion};
use trainerbot_types::session::ChatId;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct ModuleRow<'a> {
    command: String,
    name: &'a str,
    version: Option<ModuleVersion>,
    endpoint: &'a str,
    description: &'a str,
}

impl<'a> From<&'a ModuleBinding> for ModuleRow<'a> {
    fn from(binding: &'a ModuleBinding) -> Self {
        Self {
            command: binding.command(),
            name: &binding.identity.name,
            version: binding.identity.version,
            endpoint: &binding.endpoint,
            description: &binding.description,
        }
    }
}

/// Run discovery and print the resulting command registry.
pub async fn discover(state: &AppState, json: bool) -> anyhow::Result<()> {
    let discovery = state.discover().await;
    let rows: Vec<ModuleRow<'_>> = discovery.registry.iter().map(ModuleRow::from).collect();

    if json {
        let out = serde_json::json!({
            "backend": state.config.backend_url,
            "source": discovery.source.to_string(),
            "modules": rows,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!();
        println!(
            "  No modules discovered at {}.",
            style(&state.config.backend_url).cyan()
        );
        println!(
            "  {}",
            style("/train and the built-in commands remain available.").dim()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Command").fg(Color::White),
            Cell::new("Version").fg(Color::White),
            Cell::new("Endpoint").fg(Color::White),
            Cell::new("Description").fg(Color::White),
        ]);

    for row in &rows {
        table.add_row(vec![
            Cell::new(&row.command).fg(Color::Cyan),
            Cell::new(row.version.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())),
            Cell::new(row.endpoint),
            Cell::new(row.description),
        ]);
    }

    println!("{table}");
    println!(
        "  {} module(s) from {}",
        style(rows.len()).bold(),
        style(discovery.source).cyan()
    );

    Ok(())
}

/// Probe one module's candidate endpoints and report the first that answers.
pub async fn probe(
    state: &AppState,
    name: &str,
    version: Option<ModuleVersion>,
    json: bool,
) -> anyhow::Result<()> {
    let candidates = EndpointProber::default().candidates(name, version);
    let chosen = probe_candidates(state.backend.as_ref(), &candidates).await;

    if json {
        let out = serde_json::json!({
            "name": name,
            "version": version,
            "candidates": candidates,
            "endpoint": chosen,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        for candidate in &candidates {
            let mark = if chosen.as_deref() == Some(candidate.as_str()) {
                style("✓").green()
            } else {
                style("·").dim()
            };
            println!("  {mark} {candidate}");
        }
        println!();
    }

    match chosen {
        Some(endpoint) => {
            if !json {
                println!("  Endpoint: {}", style(endpoint).cyan().bold());
                println!();
            }
            Ok(())
        }
        None => anyhow::bail!(
            "no candidate endpoint for '{name}' answered at {}",
            state.config.backend_url
        ),
    }
}

#[derive(Debug, Serialize)]
struct CheckRow<'a> {
    command: &'a str,
    endpoint: &'a str,
    passed: bool,
    probe: StepRow<'a>,
    start: StepRow<'a>,
}

#[derive(Debug, Serialize)]
struct StepRow<'a> {
    ok: bool,
    message: &'a str,
}

impl<'a> From<&'a StepResult> for StepRow<'a> {
    fn from(step: &'a StepResult) -> Self {
        Self {
            ok: step.ok,
            message: &step.message,
        }
    }
}

impl<'a> From<&'a ContractCheck> for CheckRow<'a> {
    fn from(check: &'a ContractCheck) -> Self {
        Self {
            command: &check.command,
            endpoint: &check.endpoint,
            passed: check.passed(),
            probe: StepRow::from(&check.probe),
            start: StepRow::from(&check.start),
        }
    }
}

/// Discover modules and run the probe/start contract check on each.
pub async fn check(state: &AppState, chat_id: ChatId, json: bool) -> anyhow::Result<()> {
    let discovery = state.discover().await;
    let checks = check_registry(state.backend.as_ref(), &discovery.registry, chat_id).await;
    let failed = checks.iter().filter(|c| !c.passed()).count();

    if json {
        let rows: Vec<CheckRow<'_>> = checks.iter().map(CheckRow::from).collect();
        let out = serde_json::json!({
            "backend": state.config.backend_url,
            "source": discovery.source.to_string(),
            "failed": failed,
            "modules": rows,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if checks.is_empty() {
        println!();
        println!(
            "  No modules discovered at {}.",
            style(&state.config.backend_url).cyan()
        );
        println!();
    } else {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("").fg(Color::White),
                Cell::new("Command").fg(Color::White),
                Cell::new("Endpoint").fg(Color::White),
                Cell::new("Probe").fg(Color::White),
                Cell::new("Start").fg(Color::White),
            ]);

        for check in &checks {
            let mark = if check.passed() {
                Cell::new("✓").fg(Color::Green)
            } else {
                Cell::new("✗").fg(Color::Red)
            };
            table.add_row(vec![
                mark,
                Cell::new(&check.command).fg(Color::Cyan),
                Cell::new(&check.endpoint),
                step_cell(&check.probe),
                step_cell(&check.start),
            ]);
        }

        println!("{table}");
        println!(
            "  {} of {} module(s) passed",
            style(checks.len() - failed).bold(),
            checks.len()
        );
    }

    if failed > 0 {
        anyhow::bail!("{failed} module(s) failed the contract check");
    }
    Ok(())
}

fn step_cell(step: &StepResult) -> Cell {
    let color = if step.ok { Color::Green } else { Color::Red };
    Cell::new(&step.message).fg(color)
}

/// Discover modules, then fetch the snapshot of `sid` from the module bound
/// to `command`.
pub async fn snapshot(state: &AppState, command: &str, sid: &str) -> anyhow::Result<()> {
    let command = normalize_command(command);
    let discovery = state.discover().await;

    let Some(binding) = discovery.registry.get(&command) else {
        let known: Vec<String> = discovery.registry.iter().map(|b| b.command()).collect();
        anyhow::bail!(
            "unknown module command '{command}' (discovered: {})",
            if known.is_empty() {
                "none".to_string()
            } else {
                known.join(", ")
            }
        );
    };

    let snapshot = state.backend.snapshot(binding.base_path(), sid).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn normalize_command(command: &str) -> String {
    let trimmed = command.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
