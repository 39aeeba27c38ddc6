//! Workload catalog.
//!
//! The console controls a fixed set of four workloads. Each catalog entry
//! names the data keys the workload reports; anything else in an event payload
//! is dropped before it reaches the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of a monitoring workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkloadId {
    #[serde(rename = "rppg")]
    Rppg,
    #[serde(rename = "ai-ecg")]
    AiEcg,
    #[serde(rename = "mdpnp")]
    Mdpnp,
    #[serde(rename = "3d-pose")]
    Pose3d,
}

impl WorkloadId {
    /// Every workload, in catalog order.
    pub const ALL: [WorkloadId; 4] = [
        WorkloadId::Rppg,
        WorkloadId::AiEcg,
        WorkloadId::Mdpnp,
        WorkloadId::Pose3d,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WorkloadId::Rppg => "rppg",
            WorkloadId::AiEcg => "ai-ecg",
            WorkloadId::Mdpnp => "mdpnp",
            WorkloadId::Pose3d => "3d-pose",
        }
    }

    /// Catalog entry for this workload.
    #[must_use]
    pub fn spec(self) -> &'static WorkloadSpec {
        match self {
            WorkloadId::Rppg => &RPPG,
            WorkloadId::AiEcg => &AI_ECG,
            WorkloadId::Mdpnp => &MDPNP,
            WorkloadId::Pose3d => &POSE_3D,
        }
    }
}

impl fmt::Display for WorkloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown workload: {0}")]
pub struct UnknownWorkload(pub String);

impl FromStr for WorkloadId {
    type Err = UnknownWorkload;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkloadId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownWorkload(s.to_string()))
    }
}

/// Static description of a workload.
#[derive(Debug, PartialEq, Eq)]
pub struct WorkloadSpec {
    pub id: WorkloadId,
    /// Display name.
    pub name: &'static str,
    pub description: &'static str,
    /// Reading keys the workload reports.
    pub data_keys: &'static [&'static str],
    /// Whether the workload also streams a waveform.
    pub has_waveform: bool,
}

impl WorkloadSpec {
    /// True if `key` is one of the workload's reading keys.
    #[must_use]
    pub fn accepts_key(&self, key: &str) -> bool {
        self.data_keys.iter().any(|k| *k == key)
    }
}

static RPPG: WorkloadSpec = WorkloadSpec {
    id: WorkloadId::Rppg,
    name: "rPPG",
    description: "Remote Photoplethysmography - Heart Rate & Respiratory Rate",
    data_keys: &["HR", "RR"],
    has_waveform: true,
};

static AI_ECG: WorkloadSpec = WorkloadSpec {
    id: WorkloadId::AiEcg,
    name: "AI-ECG",
    description: "AI-powered ECG Analysis with 12-lead classification",
    data_keys: &["prediction", "filename"],
    has_waveform: true,
};

static MDPNP: WorkloadSpec = WorkloadSpec {
    id: WorkloadId::Mdpnp,
    name: "MDPNP",
    description: "Medical Device Plug-and-Play Integration",
    data_keys: &["HR", "CO2_ET", "BP_DIA"],
    has_waveform: true,
};

static POSE_3D: WorkloadSpec = WorkloadSpec {
    id: WorkloadId::Pose3d,
    name: "3D Pose",
    description: "3D Body Pose Estimation with joint tracking",
    data_keys: &["activity"],
    has_waveform: false,
};

/// Target of a start/stop command: one workload or all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadTarget {
    All,
    One(WorkloadId),
}

impl WorkloadTarget {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WorkloadTarget::All => "all",
            WorkloadTarget::One(id) => id.as_str(),
        }
    }

    /// Workloads covered by this target.
    #[must_use]
    pub fn workloads(self) -> Vec<WorkloadId> {
        match self {
            WorkloadTarget::All => WorkloadId::ALL.to_vec(),
            WorkloadTarget::One(id) => vec![id],
        }
    }
}

impl fmt::Display for WorkloadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for WorkloadTarget {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for WorkloadTarget {
    type Err = UnknownWorkload;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(WorkloadTarget::All)
        } else {
            s.parse().map(WorkloadTarget::One)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_entries_match_ids() {
        for id in WorkloadId::ALL {
            assert_eq!(id.spec().id, id);
        }
        assert!(!WorkloadId::Pose3d.spec().has_waveform);
        assert_eq!(WorkloadId::Mdpnp.spec().data_keys, &["HR", "CO2_ET", "BP_DIA"]);
    }

    #[test]
    fn test_ids_parse_from_wire_names() {
        assert_eq!("ai-ecg".parse::<WorkloadId>().unwrap(), WorkloadId::AiEcg);
        assert_eq!("3d-pose".parse::<WorkloadId>().unwrap(), WorkloadId::Pose3d);
        assert_eq!(
            "ecg".parse::<WorkloadId>(),
            Err(UnknownWorkload("ecg".to_string()))
        );

        let parsed: WorkloadId = serde_json::from_str("\"rppg\"").unwrap();
        assert_eq!(parsed, WorkloadId::Rppg);
    }

    #[test]
    fn test_target_serializes_as_plain_string() {
        assert_eq!(serde_json::to_string(&WorkloadTarget::All).unwrap(), "\"all\"");
        assert_eq!(
            serde_json::to_string(&WorkloadTarget::One(WorkloadId::Pose3d)).unwrap(),
            "\"3d-pose\""
        );
        assert_eq!("all".parse::<WorkloadTarget>().unwrap(), WorkloadTarget::All);
        assert_eq!(WorkloadTarget::All.workloads().len(), 4);
    }

    #[test]
    fn test_accepts_only_catalog_keys() {
        let rppg = WorkloadId::Rppg.spec();
        assert!(rppg.accepts_key("HR"));
        assert!(!rppg.accepts_key("hr"));
        assert!(!rppg.accepts_key("waveform"));
    }
}
