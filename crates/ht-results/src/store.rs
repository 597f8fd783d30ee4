//! Result storage: one directory per simulation, one subdirectory per run
//! version holding a manifest and the records as JSON lines.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use ht_core::SimulationId;
use ht_project::PhaseKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{ResultKey, SimulationResult};
use crate::{ResultsError, ResultsResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultManifest {
    pub simulation_id: SimulationId,
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    /// Stages the records cover, in execution order.
    pub phases: Vec<PhaseKind>,
    pub record_count: usize,
}

#[derive(Debug, Clone)]
pub struct ResultStore {
    root_dir: PathBuf,
}

impl ResultStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        fs::create_dir_all(&root_dir)?;
        Ok(Self { root_dir })
    }

    fn run_dir(&self, simulation_id: SimulationId, version: u32) -> PathBuf {
        self.root_dir
            .join(simulation_id.to_string())
            .join(format!("v{version}"))
    }

    pub fn has_results(&self, simulation_id: SimulationId, version: u32) -> bool {
        self.run_dir(simulation_id, version)
            .join("manifest.json")
            .exists()
    }

    /// Write the records of one run. Writing the same version again replaces it.
    pub fn save(
        &self,
        simulation_id: SimulationId,
        version: u32,
        phases: &[PhaseKind],
        results: &[SimulationResult],
    ) -> ResultsResult<ResultManifest> {
        let run_dir = self.run_dir(simulation_id, version);
        fs::create_dir_all(&run_dir)?;

        let mut lines = String::new();
        for record in results {
            lines.push_str(&serde_json::to_string(record)?);
            lines.push('\n');
        }
        fs::write(run_dir.join("results.jsonl"), lines)?;

        // Manifest last: its presence marks a complete write.
        let manifest = ResultManifest {
            simulation_id,
            version,
            saved_at: Utc::now(),
            phases: phases.to_vec(),
            record_count: results.len(),
        };
        fs::write(
            run_dir.join("manifest.json"),
            serde_json::to_string_pretty(&manifest)?,
        )?;
        debug!(
            simulation_id = %simulation_id,
            version,
            records = results.len(),
            "results saved"
        );
        Ok(manifest)
    }

    pub fn load_manifest(
        &self,
        simulation_id: SimulationId,
        version: u32,
    ) -> ResultsResult<ResultManifest> {
        let path = self.run_dir(simulation_id, version).join("manifest.json");
        if !path.exists() {
            return Err(ResultsError::ResultsNotFound {
                simulation_id,
                version,
            });
        }
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    pub fn load(
        &self,
        simulation_id: SimulationId,
        version: u32,
    ) -> ResultsResult<Vec<SimulationResult>> {
        self.load_manifest(simulation_id, version)?;
        let path = self.run_dir(simulation_id, version).join("results.jsonl");
        let content = fs::read_to_string(path)?;
        let mut records = Vec::new();
        for line in content.lines() {
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(line)?);
            }
        }
        Ok(records)
    }

    pub fn find(
        &self,
        simulation_id: SimulationId,
        version: u32,
        key: &ResultKey,
    ) -> ResultsResult<Option<SimulationResult>> {
        Ok(self
            .load(simulation_id, version)?
            .into_iter()
            .find(|r| r.key == *key))
    }

    /// Versions with stored results, ascending.
    pub fn versions(&self, simulation_id: SimulationId) -> ResultsResult<Vec<u32>> {
        let dir = self.root_dir.join(simulation_id.to_string());
        let mut versions = Vec::new();
        if !dir.exists() {
            return Ok(versions);
        }
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(version) = name.strip_prefix('v').and_then(|v| v.parse().ok())
                && self.has_results(simulation_id, version)
            {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }
}
