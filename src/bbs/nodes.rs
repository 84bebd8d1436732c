//! Node directory: what this BBS knows about other mesh nodes.
//!
//! Seeded from `[[nodes]]` in the config and extended as senders are heard.
//! Backs short-name resolution for mail and the stats / wall-of-shame views.

use std::collections::BTreeMap;

use log::warn;

use crate::config::{format_node_id, parse_node_id, NodeSeed};

/// Battery percentage below which a node lands on the wall of shame.
pub const LOW_BATTERY_PERCENT: u8 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub id: u32,
    pub short_name: String,
    pub long_name: String,
    pub hw_model: Option<String>,
    pub role: Option<String>,
    pub battery_level: Option<u8>,
}

impl NodeInfo {
    /// Placeholder entry for a node heard before it announced itself.
    pub fn unknown(id: u32) -> Self {
        let name = format_node_id(id);
        Self {
            id,
            short_name: name[name.len() - 4..].to_string(),
            long_name: name,
            hw_model: None,
            role: None,
            battery_level: None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct NodeDirectory {
    nodes: BTreeMap<u32, NodeInfo>,
}

impl NodeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seeds(seeds: &[NodeSeed]) -> Self {
        let mut dir = Self::new();
        for seed in seeds {
            let Some(id) = parse_node_id(&seed.id) else {
                warn!("Skipping node seed with invalid id '{}'", seed.id);
                continue;
            };
            dir.upsert(NodeInfo {
                id,
                short_name: seed.short_name.clone(),
                long_name: seed.long_name.clone(),
                hw_model: seed.hw_model.clone(),
                role: seed.role.clone(),
                battery_level: seed.battery_level,
            });
        }
        dir
    }

    pub fn upsert(&mut self, info: NodeInfo) {
        self.nodes.insert(info.id, info);
    }

    /// Record that `id` was heard; keeps existing details.
    pub fn touch(&mut self, id: u32) {
        self.nodes.entry(id).or_insert_with(|| NodeInfo::unknown(id));
    }

    pub fn get(&self, id: u32) -> Option<&NodeInfo> {
        self.nodes.get(&id)
    }

    pub fn short_name(&self, id: u32) -> String {
        self.nodes
            .get(&id)
            .map(|n| n.short_name.clone())
            .unwrap_or_else(|| NodeInfo::unknown(id).short_name)
    }

    /// Case-insensitive short-name lookup; the lowest id wins on collisions.
    pub fn find_by_short_name(&self, short_name: &str) -> Option<u32> {
        let wanted = short_name.trim();
        self.nodes
            .values()
            .find(|n| n.short_name.eq_ignore_ascii_case(wanted))
            .map(|n| n.id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn hardware_breakdown(&self) -> Vec<(String, usize)> {
        Self::breakdown(self.nodes.values().map(|n| n.hw_model.as_deref()))
    }

    pub fn role_breakdown(&self) -> Vec<(String, usize)> {
        Self::breakdown(self.nodes.values().map(|n| n.role.as_deref()))
    }

    fn breakdown<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for v in values {
            *counts.entry(v.unwrap_or("UNKNOWN").to_string()).or_default() += 1;
        }
        let mut out: Vec<(String, usize)> = counts.into_iter().collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        out
    }

    /// Nodes reporting a battery level under [`LOW_BATTERY_PERCENT`], lowest first.
    pub fn low_battery(&self) -> Vec<&NodeInfo> {
        let mut out: Vec<&NodeInfo> = self
            .nodes
            .values()
            .filter(|n| matches!(n.battery_level, Some(b) if b < LOW_BATTERY_PERCENT))
            .collect();
        out.sort_by_key(|n| n.battery_level);
        out
    }
}
