use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use capi_client::{HttpControlPlane, allocator_from_config};
use capi_core::{Task, ToolConfig};
use capi_scheduler::{NetworkAllocator, Placement, RetryScheduler, StaticAllocator};

use crate::Format;
use crate::settings::SubmitOverrides;

pub async fn submit(
    config: &ToolConfig,
    task_path: &Path,
    overrides: SubmitOverrides,
    format: Format,
) -> anyhow::Result<()> {
    let mut task = Task::from_file(task_path)?;
    overrides.apply_identity(&mut task);

    let allocator: Arc<dyn NetworkAllocator> = if overrides.has_identity() {
        Arc::new(StaticAllocator)
    } else {
        allocator_from_config(
            &config.allocator,
            Duration::from_secs(config.control_plane.timeout_secs),
        )
    };
    let control_plane = Arc::new(HttpControlPlane::from_config(&config.control_plane));
    let scheduler = RetryScheduler::new(control_plane, allocator, overrides.scheduler_config(config))?;

    match scheduler.run(&task).await {
        Ok(placement) => {
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&placement)?),
                Format::Text => print!("{}", format_placement(&task, &placement)),
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Submit failed: {e}");
            Err(e.into())
        }
    }
}

fn format_placement(task: &Task, placement: &Placement) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "✓ Placed {} on {} (attempt {})\n",
        task.identity(),
        placement.host_id,
        placement.attempts
    ));
    out.push_str(&format!("  Group:     {}\n", placement.group_id));
    out.push_str(&format!("  Operation: {}\n", placement.group_operation_id));
    out.push_str(&format!("  Etag:      {}\n", placement.etag));
    out.push_str(&format!(
        "  Address:   {} ({})\n",
        placement.network.ip, placement.network.hostname
    ));
    out
}
