//! Reader for CD-HIT `.clstr` cluster files
//!
//! ```text
//! >Cluster 0
//! 0	607aa, >sp|P02769|ALBU_BOVIN... *
//! 1	583aa, >tr|A0A140T897|A0A140T897_BOVIN... at 95.12%
//! ```

use crate::Error;
use fnv::FnvHashMap;
use regex::Regex;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterEntry {
    pub number: usize,
    /// Protein id of the representative sequence
    pub centroid: String,
    /// Protein ids, in file order
    pub members: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ClusterMap {
    pub clusters: Vec<ClusterEntry>,
    index: FnvHashMap<String, usize>,
}

impl ClusterMap {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Error> {
        let header = Regex::new(r"^>Cluster\s+(\d+)").map_err(|e| Error::ClusterFormat {
            line: 0,
            reason: e.to_string(),
        })?;
        // Ids end at the `...` CD-HIT appends, not at the first dot
        let member = Regex::new(r">([^|\s]*\|)?([^|\s]+?)(?:\.\.\.|[|\s]|$)").map_err(|e| {
            Error::ClusterFormat {
                line: 0,
                reason: e.to_string(),
            }
        })?;

        let mut clusters: Vec<ClusterEntry> = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(caps) = header.captures(line) {
                let number = caps[1].parse::<usize>().map_err(|e| Error::ClusterFormat {
                    line: idx + 1,
                    reason: e.to_string(),
                })?;
                clusters.push(ClusterEntry {
                    number,
                    centroid: String::new(),
                    members: Vec::new(),
                });
                continue;
            }

            let cluster = clusters.last_mut().ok_or_else(|| Error::ClusterFormat {
                line: idx + 1,
                reason: "member listed before any cluster header".into(),
            })?;
            let id = member
                .captures(line)
                .map(|caps| caps[2].to_string())
                .ok_or_else(|| Error::ClusterFormat {
                    line: idx + 1,
                    reason: format!("no protein id in `{}`", line),
                })?;
            if line.ends_with('*') {
                cluster.centroid = id.clone();
            }
            cluster.members.push(id);
        }

        for cluster in clusters.iter_mut() {
            if cluster.centroid.is_empty() {
                log::warn!("cluster {} has no representative sequence", cluster.number);
                cluster.centroid = cluster.members.first().cloned().unwrap_or_default();
            }
        }

        Ok(Self::from(clusters))
    }

    /// Index into `clusters` of the cluster containing `protein_id`
    pub fn find(&self, protein_id: &str) -> Option<usize> {
        self.index.get(protein_id).copied()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

impl From<Vec<ClusterEntry>> for ClusterMap {
    fn from(clusters: Vec<ClusterEntry>) -> Self {
        let mut index = FnvHashMap::default();
        for (idx, cluster) in clusters.iter().enumerate() {
            for member in &cluster.members {
                if index.insert(member.clone(), idx).is_some() {
                    log::warn!("protein {} appears in more than one cluster", member);
                }
            }
        }
        ClusterMap { clusters, index }
    }
}
