use std::path::Path;

use capi_client::HttpControlPlane;
use capi_core::{Task, ToolConfig};
use capi_scheduler::{RandomIds, TaskLocation, destroy_task, locate_task};
use capi_state::StateFilter;

use super::fetch_snapshot;
use crate::Format;

pub async fn task_info(config: &ToolConfig, task_path: &Path, format: Format) -> anyhow::Result<()> {
    let task = Task::from_file(task_path)?;
    let snapshot = fetch_snapshot(config, &StateFilter::all()).await?;
    let locations = locate_task(&snapshot, &task);

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&locations)?),
        Format::Text => print!("{}", format_locations(&task, &locations)),
    }
    Ok(())
}

pub async fn destroy(config: &ToolConfig, task_path: &Path, format: Format) -> anyhow::Result<()> {
    let task = Task::from_file(task_path)?;
    let control_plane = HttpControlPlane::from_config(&config.control_plane);

    let teardown = match destroy_task(
        &control_plane,
        &RandomIds,
        &task,
        &StateFilter::all(),
        config.owner.priority,
    )
    .await
    {
        Ok(teardown) => teardown,
        Err(e) => {
            eprintln!("Destroy failed: {e}");
            return Err(e.into());
        }
    };

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&teardown)?),
        Format::Text => match &teardown.group_id {
            Some(group) => {
                println!(
                    "✓ Removal of {} accepted ({} workloads on {} hosts)",
                    task.slot_service(),
                    teardown.workloads,
                    teardown.hosts.len()
                );
                println!("  Group: {group}");
                for host in &teardown.hosts {
                    println!("  • {host}");
                }
            }
            None => println!("No running workloads for {}", task.slot_service()),
        },
    }
    Ok(())
}

fn format_locations(task: &Task, locations: &[TaskLocation]) -> String {
    let mut out = String::new();
    if locations.is_empty() {
        out.push_str(&format!("No running workloads for {}\n", task.slot_service()));
        return out;
    }

    out.push_str(&format!("{} ({} workloads)\n\n", task.slot_service(), locations.len()));
    out.push_str(&format!(
        "{:<40} {:<12} {:>12} {:<10} {}\n",
        "HOST", "HEALTH", "ETAG", "TARGET", "CONTAINER"
    ));
    for loc in locations {
        out.push_str(&format!(
            "{:<40} {:<12} {:>12} {:<10} {}\n",
            loc.host_id,
            loc.health,
            loc.etag,
            loc.workload.target_state,
            loc.workload.container().id
        ));
    }
    out
}
