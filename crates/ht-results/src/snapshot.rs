//! Immutable, versioned copies of the inputs and headline outputs of a run.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use ht_core::SimulationId;
use ht_kinetics::TransformationParameters;
use ht_material::MaterialModel;
use ht_project::SimulationConfig;
use ht_sim::{LocationMicrostructure, PhaseSummary};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::hash::input_hash;
use crate::types::ResultKey;
use crate::{ResultsError, ResultsResult};

/// Everything needed to reproduce the run. The material is the resolved
/// property set, so later catalog changes do not affect the copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInputs {
    pub config: SimulationConfig,
    pub material: MaterialModel,
    pub transformation: TransformationParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotOutputs {
    pub phases: Vec<PhaseSummary>,
    pub microstructure: Vec<LocationMicrostructure>,
    pub result_keys: Vec<ResultKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SnapshotStatus {
    Completed,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub id: Uuid,
    pub simulation_id: SimulationId,
    /// 1-based, increasing per simulation.
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub status: SnapshotStatus,
    /// SHA-256 of `inputs`.
    pub input_hash: String,
    pub inputs: SnapshotInputs,
    pub outputs: SnapshotOutputs,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        fs::create_dir_all(&root_dir)?;
        Ok(Self { root_dir })
    }

    fn dir(&self, simulation_id: SimulationId) -> PathBuf {
        self.root_dir.join(simulation_id.to_string())
    }

    fn path(&self, simulation_id: SimulationId, version: u32) -> PathBuf {
        self.dir(simulation_id).join(format!("snapshot-{version}.json"))
    }

    /// Stored versions, ascending.
    pub fn versions(&self, simulation_id: SimulationId) -> ResultsResult<Vec<u32>> {
        let dir = self.dir(simulation_id);
        let mut versions = Vec::new();
        if !dir.exists() {
            return Ok(versions);
        }
        for entry in fs::read_dir(dir)? {
            let name = entry?.file_name().to_string_lossy().to_string();
            if let Some(v) = name
                .strip_prefix("snapshot-")
                .and_then(|rest| rest.strip_suffix(".json"))
                .and_then(|v| v.parse().ok())
            {
                versions.push(v);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    /// Version the next [`create`](Self::create) would use.
    pub fn next_version(&self, simulation_id: SimulationId) -> ResultsResult<u32> {
        Ok(self
            .versions(simulation_id)?
            .last()
            .map_or(1, |latest| latest + 1))
    }

    /// Freeze a run as the next version. An existing file is never replaced.
    pub fn create(
        &self,
        simulation_id: SimulationId,
        inputs: SnapshotInputs,
        outputs: SnapshotOutputs,
        status: SnapshotStatus,
    ) -> ResultsResult<SimulationSnapshot> {
        let version = self.next_version(simulation_id)?;
        self.create_version(simulation_id, version, inputs, outputs, status)
    }

    /// Freeze a run as `version`, failing with
    /// [`ResultsError::SnapshotExists`] when that version is taken.
    pub fn create_version(
        &self,
        simulation_id: SimulationId,
        version: u32,
        inputs: SnapshotInputs,
        outputs: SnapshotOutputs,
        status: SnapshotStatus,
    ) -> ResultsResult<SimulationSnapshot> {
        let snapshot = SimulationSnapshot {
            id: Uuid::new_v4(),
            simulation_id,
            version,
            created_at: Utc::now(),
            status,
            input_hash: input_hash(&inputs)?,
            inputs,
            outputs,
        };

        let dir = self.dir(simulation_id);
        fs::create_dir_all(&dir)?;
        let tmp = dir.join(format!(".snapshot-{}.tmp", snapshot.id));
        fs::write(&tmp, serde_json::to_string_pretty(&snapshot)?)?;
        // hard_link fails when the target exists.
        let linked = fs::hard_link(&tmp, self.path(simulation_id, version));
        fs::remove_file(&tmp)?;
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ResultsError::SnapshotExists {
                    simulation_id,
                    version,
                });
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            simulation_id = %simulation_id,
            version,
            input_hash = %snapshot.input_hash,
            "snapshot created"
        );
        Ok(snapshot)
    }

    pub fn load(
        &self,
        simulation_id: SimulationId,
        version: u32,
    ) -> ResultsResult<SimulationSnapshot> {
        let path = self.path(simulation_id, version);
        if !path.exists() {
            return Err(ResultsError::SnapshotNotFound {
                simulation_id,
                version,
            });
        }
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    pub fn latest(
        &self,
        simulation_id: SimulationId,
    ) -> ResultsResult<Option<SimulationSnapshot>> {
        match self.versions(simulation_id)?.last() {
            Some(&v) => self.load(simulation_id, v).map(Some),
            None => Ok(None),
        }
    }

    pub fn list(&self, simulation_id: SimulationId) -> ResultsResult<Vec<SimulationSnapshot>> {
        self.versions(simulation_id)?
            .into_iter()
            .map(|v| self.load(simulation_id, v))
            .collect()
    }
}
