//! Resource vectors — capacity and demand arithmetic.
//!
//! A [`ResourceVector`] is the decoded form of the control plane's
//! `ComputingResources` message. Numeric dimensions are held as `i64`
//! so that deducting a running workload from a host can never wrap:
//! an overshoot is either clamped and reported, or rejected, depending
//! on the [`UnderflowPolicy`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, ResourceError};

/// Raw computing resources as they appear on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComputingResources {
    pub cpu_power_percents_core: u32,
    pub ram_bytes: u64,
    pub hdd_space_bytes: u64,
    pub network_outgoing_bps: u64,
    pub iops_read: u32,
    pub iops_write: u32,
    pub has_ssd: bool,
    pub has_ipv4: bool,
    pub has_ipv6: bool,
    /// Extensible countables (rack slots, datacenter quotas, ...).
    pub named_countables: Vec<NamedCountable>,
}

/// A named countable resource, e.g. `"rack.slots" = 4`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedCountable {
    pub name: String,
    pub capacity: u64,
}

/// One axis of a resource vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Cpu,
    Memory,
    Net,
    Hdd,
    IoRead,
    IoWrite,
    Ssd,
    Ipv4,
    Ipv6,
    Tag(String),
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Cpu => f.write_str("cpu"),
            Dimension::Memory => f.write_str("memory"),
            Dimension::Net => f.write_str("net"),
            Dimension::Hdd => f.write_str("hdd"),
            Dimension::IoRead => f.write_str("io_read"),
            Dimension::IoWrite => f.write_str("io_write"),
            Dimension::Ssd => f.write_str("ssd"),
            Dimension::Ipv4 => f.write_str("ipv4"),
            Dimension::Ipv6 => f.write_str("ipv6"),
            Dimension::Tag(name) => write!(f, "tag:{name}"),
        }
    }
}

const NUMERIC_DIMENSIONS: [Dimension; 6] = [
    Dimension::Cpu,
    Dimension::Memory,
    Dimension::Net,
    Dimension::Hdd,
    Dimension::IoRead,
    Dimension::IoWrite,
];

/// What to do when a deduction would drive a dimension below zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnderflowPolicy {
    /// Clamp to zero and report the affected dimensions.
    #[default]
    Clamp,
    /// Fail with [`ResourceError::Underflow`].
    Strict,
}

/// Decoded capacity or demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceVector {
    /// CPU in percent-of-core units (100 = one core).
    pub cpu: i64,
    pub memory: i64,
    /// Outgoing network bandwidth (bps).
    pub net: i64,
    pub hdd: i64,
    pub io_read: i64,
    pub io_write: i64,
    pub has_ssd: bool,
    pub has_ipv4: bool,
    pub has_ipv6: bool,
    pub tags: BTreeMap<String, i64>,
}

/// Result of [`ResourceVector::subtract`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduction {
    pub remaining: ResourceVector,
    /// Dimensions that were clamped to zero.
    pub underflow: Vec<Dimension>,
}

impl Deduction {
    pub fn is_clean(&self) -> bool {
        self.underflow.is_empty()
    }
}

impl ResourceVector {
    /// Decode a raw resource message.
    ///
    /// `context` names the owner of the message (a host or workload id)
    /// and ends up in the error. Countables are expanded into `tags`;
    /// a later countable with the same name overwrites an earlier one.
    pub fn decode(
        raw: Option<&ComputingResources>,
        context: &str,
    ) -> Result<Self, DecodeError> {
        let raw = raw.ok_or_else(|| DecodeError::Missing(context.to_string()))?;

        let mut tags = BTreeMap::new();
        for countable in &raw.named_countables {
            if countable.name.is_empty() {
                return Err(DecodeError::Malformed {
                    context: context.to_string(),
                    reason: "named countable without a name".to_string(),
                });
            }
            let capacity = to_signed(countable.capacity, context, &countable.name)?;
            tags.insert(countable.name.clone(), capacity);
        }

        Ok(Self {
            cpu: i64::from(raw.cpu_power_percents_core),
            memory: to_signed(raw.ram_bytes, context, "ram_bytes")?,
            net: to_signed(raw.network_outgoing_bps, context, "network_outgoing_bps")?,
            hdd: to_signed(raw.hdd_space_bytes, context, "hdd_space_bytes")?,
            io_read: i64::from(raw.iops_read),
            io_write: i64::from(raw.iops_write),
            has_ssd: raw.has_ssd,
            has_ipv4: raw.has_ipv4,
            has_ipv6: raw.has_ipv6,
            tags,
        })
    }

    /// Value of a numeric dimension. `None` for flags and absent tags.
    pub fn numeric(&self, dimension: &Dimension) -> Option<i64> {
        match dimension {
            Dimension::Cpu => Some(self.cpu),
            Dimension::Memory => Some(self.memory),
            Dimension::Net => Some(self.net),
            Dimension::Hdd => Some(self.hdd),
            Dimension::IoRead => Some(self.io_read),
            Dimension::IoWrite => Some(self.io_write),
            Dimension::Tag(name) => self.tags.get(name).copied(),
            Dimension::Ssd | Dimension::Ipv4 | Dimension::Ipv6 => None,
        }
    }

    fn numeric_mut(&mut self, dimension: &Dimension) -> Option<&mut i64> {
        match dimension {
            Dimension::Cpu => Some(&mut self.cpu),
            Dimension::Memory => Some(&mut self.memory),
            Dimension::Net => Some(&mut self.net),
            Dimension::Hdd => Some(&mut self.hdd),
            Dimension::IoRead => Some(&mut self.io_read),
            Dimension::IoWrite => Some(&mut self.io_write),
            Dimension::Tag(name) => self.tags.get_mut(name),
            Dimension::Ssd | Dimension::Ipv4 | Dimension::Ipv6 => None,
        }
    }

    /// Component-wise `self - other`.
    ///
    /// Tags are deducted only where `self` carries them; tags present
    /// only in `other` are ignored. Flags of `self` are kept as-is.
    pub fn subtract(
        &self,
        other: &ResourceVector,
        policy: UnderflowPolicy,
    ) -> Result<Deduction, ResourceError> {
        let mut remaining = self.clone();
        let mut underflow = Vec::new();

        let tag_dimensions = self.tags.keys().cloned().map(Dimension::Tag);
        for dimension in NUMERIC_DIMENSIONS.iter().cloned().chain(tag_dimensions) {
            let deduct = other.numeric(&dimension).unwrap_or(0);
            let Some(slot) = remaining.numeric_mut(&dimension) else {
                continue;
            };
            let have = *slot;
            let left = have.saturating_sub(deduct);
            if left >= 0 {
                *slot = left;
                continue;
            }
            match policy {
                UnderflowPolicy::Strict => {
                    return Err(ResourceError::Underflow {
                        dimension,
                        have,
                        deduct,
                    });
                }
                UnderflowPolicy::Clamp => {
                    *slot = 0;
                    underflow.push(dimension);
                }
            }
        }

        Ok(Deduction {
            remaining,
            underflow,
        })
    }

    /// Whether `demand` can be satisfied from `self`.
    pub fn fits(&self, demand: &ResourceVector) -> bool {
        self.shortfall(demand).is_empty()
    }

    /// Dimensions on which `demand` exceeds `self`.
    ///
    /// A flag is only checked when the demand sets it, a tag only when
    /// the demand declares it.
    pub fn shortfall(&self, demand: &ResourceVector) -> Vec<Dimension> {
        let mut missing: Vec<Dimension> = NUMERIC_DIMENSIONS
            .iter()
            .filter(|d| demand.numeric(d) > self.numeric(d))
            .cloned()
            .collect();

        if demand.has_ssd && !self.has_ssd {
            missing.push(Dimension::Ssd);
        }
        if demand.has_ipv4 && !self.has_ipv4 {
            missing.push(Dimension::Ipv4);
        }
        if demand.has_ipv6 && !self.has_ipv6 {
            missing.push(Dimension::Ipv6);
        }

        for (name, &need) in &demand.tags {
            match self.tags.get(name) {
                Some(&have) if have >= need => {}
                _ => missing.push(Dimension::Tag(name.clone())),
            }
        }

        missing
    }

    /// Saturating component-wise sum, used for cluster-wide totals.
    pub fn accumulate(&mut self, other: &ResourceVector) {
        self.cpu = self.cpu.saturating_add(other.cpu);
        self.memory = self.memory.saturating_add(other.memory);
        self.net = self.net.saturating_add(other.net);
        self.hdd = self.hdd.saturating_add(other.hdd);
        self.io_read = self.io_read.saturating_add(other.io_read);
        self.io_write = self.io_write.saturating_add(other.io_write);
        self.has_ssd |= other.has_ssd;
        self.has_ipv4 |= other.has_ipv4;
        self.has_ipv6 |= other.has_ipv6;
        for (name, &value) in &other.tags {
            let slot = self.tags.entry(name.clone()).or_insert(0);
            *slot = slot.saturating_add(value);
        }
    }
}

fn to_signed(value: u64, context: &str, field: &str) -> Result<i64, DecodeError> {
    i64::try_from(value).map_err(|_| DecodeError::Malformed {
        context: context.to_string(),
        reason: format!("{field} out of range: {value}"),
    })
}
