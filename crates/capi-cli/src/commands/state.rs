use anyhow::anyhow;
use serde::Serialize;

use capi_core::ToolConfig;
use capi_state::report::{ClusterSummary, format_host, format_state, summarize};
use capi_state::{HostSnapshot, StateFilter, find_host};

use super::fetch_snapshot;
use crate::Format;

#[derive(Serialize)]
struct StateReport<'a> {
    summary: ClusterSummary,
    hosts: &'a [HostSnapshot],
}

pub async fn state(
    config: &ToolConfig,
    host_filter: Option<String>,
    workload_filter: Option<String>,
    format: Format,
) -> anyhow::Result<()> {
    let filter = StateFilter::new(
        host_filter.unwrap_or_else(|| config.scheduling.host_filter.clone()),
        workload_filter.unwrap_or_else(|| config.scheduling.workload_filter.clone()),
    );
    let snapshot = fetch_snapshot(config, &filter).await?;

    match format {
        Format::Json => {
            let report = StateReport {
                summary: summarize(&snapshot),
                hosts: &snapshot,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Format::Text => print!("{}", format_state(&snapshot)),
    }
    Ok(())
}

pub async fn host(config: &ToolConfig, host_id: &str, format: Format) -> anyhow::Result<()> {
    let snapshot = fetch_snapshot(config, &StateFilter::for_host(host_id)).await?;
    let host = find_host(&snapshot, host_id).ok_or_else(|| anyhow!("host {host_id} not found"))?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(host)?),
        Format::Text => print!("{}", format_host(host)),
    }
    Ok(())
}
