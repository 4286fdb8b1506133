//! Human-readable snapshot formatting.

use std::collections::BTreeMap;

use serde::Serialize;

use capi_core::ResourceVector;

use crate::snapshot::HostSnapshot;
use crate::types::Entity;

/// Cluster-wide aggregates over a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub hosts: usize,
    /// Health state → host count.
    pub hosts_by_health: BTreeMap<String, usize>,
    pub instances: usize,
    pub jobs: usize,
    pub total: ResourceVector,
    /// Free capacity on placeable (UP) hosts only.
    pub free_up: ResourceVector,
}

pub fn summarize(snapshot: &[HostSnapshot]) -> ClusterSummary {
    let mut summary = ClusterSummary {
        hosts: snapshot.len(),
        ..Default::default()
    };

    for host in snapshot {
        *summary
            .hosts_by_health
            .entry(host.health.to_string())
            .or_insert(0) += 1;
        summary.total.accumulate(&host.total);
        if host.is_up() {
            summary.free_up.accumulate(&host.free);
        }
        for wl in &host.workloads {
            match wl.entity {
                Entity::Instance(_) => summary.instances += 1,
                Entity::Job(_) => summary.jobs += 1,
            }
        }
    }

    summary
}

pub fn format_state(snapshot: &[HostSnapshot]) -> String {
    let summary = summarize(snapshot);
    let mut out = String::new();

    out.push_str(&format!(
        "{:<40} {:<12} {:>12} {:>10} {:>16} {:>16} {:>5}\n",
        "HOST", "HEALTH", "ETAG", "CPU FREE", "MEM FREE", "MEM TOTAL", "WLS"
    ));
    for host in snapshot {
        out.push_str(&format!(
            "{:<40} {:<12} {:>12} {:>10} {:>16} {:>16} {:>5}\n",
            host.id,
            host.health,
            host.etag,
            format!("{}/{}", host.free.cpu, host.total.cpu),
            host.free.memory,
            host.total.memory,
            host.workloads.len(),
        ));
    }

    out.push('\n');
    out.push_str(&format!("Hosts: {}", summary.hosts));
    for (health, count) in &summary.hosts_by_health {
        out.push_str(&format!("  {health}={count}"));
    }
    out.push('\n');
    out.push_str(&format!(
        "Workloads: {} instances, {} jobs\n",
        summary.instances, summary.jobs
    ));
    out.push_str(&format!(
        "Free on UP hosts: cpu {} / mem {} bytes\n",
        summary.free_up.cpu, summary.free_up.memory
    ));

    out
}

pub fn format_host(host: &HostSnapshot) -> String {
    let mut out = String::new();

    out.push_str(&format!("Host:     {}\n", host.id));
    out.push_str(&format!("Health:   {}\n", host.health));
    out.push_str(&format!("Etag:     {}\n", host.etag));
    if !host.location.is_empty() {
        out.push_str(&format!("Location: {}\n", host.location));
    }
    out.push('\n');

    out.push_str(&format!("{:<12} {:>20} {:>20}\n", "RESOURCE", "FREE", "TOTAL"));
    for (name, free, total) in [
        ("cpu", host.free.cpu, host.total.cpu),
        ("memory", host.free.memory, host.total.memory),
        ("net", host.free.net, host.total.net),
        ("hdd", host.free.hdd, host.total.hdd),
        ("io_read", host.free.io_read, host.total.io_read),
        ("io_write", host.free.io_write, host.total.io_write),
    ] {
        out.push_str(&format!("{name:<12} {free:>20} {total:>20}\n"));
    }
    for (tag, total) in &host.total.tags {
        let free = host.free.tags.get(tag).copied().unwrap_or(0);
        out.push_str(&format!("{tag:<12} {free:>20} {total:>20}\n"));
    }
    out.push_str(&format!(
        "flags: ssd={} ipv4={} ipv6={}\n\n",
        host.total.has_ssd, host.total.has_ipv4, host.total.has_ipv6
    ));

    out.push_str(&format!("Workloads ({}):\n", host.workloads.len()));
    for wl in &host.workloads {
        out.push_str(&format!(
            "  • {} [{}] {} container={}\n",
            wl.id.slot.service,
            wl.kind(),
            wl.target_state,
            wl.container().id
        ));
    }

    out
}
