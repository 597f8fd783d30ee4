use ht_mesh::ProbeLocation;
use nalgebra::DVector;

/// Temperature history of one phase. Times are relative to the phase start.
#[derive(Debug, Clone)]
pub struct TemperatureHistory {
    pub(crate) times: Vec<f64>,
    pub(crate) fields: Vec<DVector<f64>>,
    pub(crate) step_times: Vec<f64>,
    pub(crate) probes: Vec<(ProbeLocation, Vec<f64>)>,
    pub(crate) final_field: DVector<f64>,
    pub(crate) steps: usize,
    pub(crate) picard_iterations: usize,
}

impl TemperatureHistory {
    pub(crate) fn start(initial: &DVector<f64>, probe_indices: &[(ProbeLocation, usize)]) -> Self {
        Self {
            times: vec![0.0],
            fields: vec![initial.clone()],
            step_times: vec![0.0],
            probes: probe_indices
                .iter()
                .map(|(loc, idx)| (*loc, vec![initial[*idx]]))
                .collect(),
            final_field: initial.clone(),
            steps: 0,
            picard_iterations: 0,
        }
    }

    pub(crate) fn push_step(
        &mut self,
        t: f64,
        field: &DVector<f64>,
        probe_indices: &[(ProbeLocation, usize)],
        record: bool,
    ) {
        self.steps += 1;
        self.step_times.push(t);
        for ((_, series), (_, idx)) in self.probes.iter_mut().zip(probe_indices) {
            series.push(field[*idx]);
        }
        if record {
            self.times.push(t);
            self.fields.push(field.clone());
        }
        self.final_field.copy_from(field);
    }

    /// Make sure the last step is among the recorded fields.
    pub(crate) fn seal(&mut self) {
        let last_t = self.step_times.last().copied().unwrap_or(0.0);
        if self.times.last().copied() != Some(last_t) {
            self.times.push(last_t);
            self.fields.push(self.final_field.clone());
        }
    }

    /// Times of the recorded fields.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn fields(&self) -> &[DVector<f64>] {
        &self.fields
    }

    pub fn final_field(&self) -> &DVector<f64> {
        &self.final_field
    }

    /// Time of every step, starting at 0.
    pub fn step_times(&self) -> &[f64] {
        &self.step_times
    }

    /// Temperature at a probe location after every step.
    pub fn probe(&self, location: ProbeLocation) -> Option<&[f64]> {
        self.probes
            .iter()
            .find(|(loc, _)| *loc == location)
            .map(|(_, series)| series.as_slice())
    }

    pub fn duration(&self) -> f64 {
        self.step_times.last().copied().unwrap_or(0.0)
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Total Picard iterations spent in this phase.
    pub fn picard_iterations(&self) -> usize {
        self.picard_iterations
    }
}
