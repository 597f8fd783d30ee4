//! Serde schema of a heat-treatment simulation configuration.
//!
//! Times are seconds, lengths metres, temperatures °C, heat transfer
//! coefficients W/(m²·K). Every field has the default used when a document
//! omits it.

use ht_kinetics::TransformationParameters;
use ht_material::{MaterialError, MaterialModel, catalog};
use ht_mesh::Geometry;
use ht_solver::SolverSettings;
use serde::{Deserialize, Serialize};

pub const LATEST_VERSION: u32 = 1;

/// Stages of a cycle in execution order. `CoolDown` is not configured on its
/// own; it follows an enabled tempering stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Heating,
    Transfer,
    Quenching,
    Tempering,
    CoolDown,
}

impl PhaseKind {
    pub fn label(self) -> &'static str {
        match self {
            PhaseKind::Heating => "heating",
            PhaseKind::Transfer => "transfer",
            PhaseKind::Quenching => "quenching",
            PhaseKind::Tempering => "tempering",
            PhaseKind::CoolDown => "cool_down",
        }
    }
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuenchMedia {
    #[default]
    Water,
    Oil,
    Polymer,
    Brine,
    Air,
}

impl QuenchMedia {
    /// Still-bath heat transfer coefficient [W/(m²·K)].
    pub fn base_htc(self) -> f64 {
        match self {
            QuenchMedia::Water => 3000.0,
            QuenchMedia::Oil => 800.0,
            QuenchMedia::Polymer => 1200.0,
            QuenchMedia::Brine => 4500.0,
            QuenchMedia::Air => 25.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Agitation {
    None,
    Mild,
    #[default]
    Moderate,
    Strong,
    Violent,
}

impl Agitation {
    pub fn multiplier(self) -> f64 {
        match self {
            Agitation::None => 1.0,
            Agitation::Mild => 1.3,
            Agitation::Moderate => 1.6,
            Agitation::Strong => 2.0,
            Agitation::Violent => 2.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FurnaceAtmosphere {
    #[default]
    Air,
    Inert,
    Protective,
    /// No convection; radiation only.
    Vacuum,
}

/// Cold-furnace loading: the furnace climbs from `start_temperature_c` at
/// `rate_c_per_min` until it reaches the set point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FurnaceRamp {
    pub start_temperature_c: f64,
    pub rate_c_per_min: f64,
}

impl FurnaceRamp {
    /// Seconds needed to reach `target_c`.
    pub fn duration_to(&self, target_c: f64) -> f64 {
        if self.rate_c_per_min <= 0.0 || target_c <= self.start_temperature_c {
            0.0
        } else {
            (target_c - self.start_temperature_c) / self.rate_c_per_min * 60.0
        }
    }
}

/// When a phase stops.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndCondition {
    #[default]
    FixedDuration,
    /// Stop once |dT/dt| at the reference node, after first exceeding the
    /// threshold, drops below it again.
    RateThreshold {
        threshold_c_per_hr: f64,
        /// Nodes from the center toward the surface.
        #[serde(default)]
        reference_offset: usize,
        #[serde(default = "default_rate_window")]
        window_s: f64,
        #[serde(default)]
        hold_after_trigger_s: f64,
    },
    /// Stop once the part is uniform and at the ambient temperature.
    Equilibrium { epsilon_c: f64 },
}

fn default_rate_window() -> f64 {
    60.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatingConfig {
    pub enabled: bool,
    pub initial_temperature_c: f64,
    pub target_temperature_c: f64,
    pub hold_s: f64,
    pub htc: f64,
    /// Overrides the material emissivity when set.
    pub emissivity: Option<f64>,
    pub use_radiation: bool,
    pub atmosphere: FurnaceAtmosphere,
    pub ramp: Option<FurnaceRamp>,
    pub end_condition: EndCondition,
}

impl Default for HeatingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_temperature_c: 25.0,
            target_temperature_c: 850.0,
            hold_s: 3600.0,
            htc: 25.0,
            emissivity: None,
            use_radiation: true,
            atmosphere: FurnaceAtmosphere::Air,
            ramp: None,
            end_condition: EndCondition::FixedDuration,
        }
    }
}

impl HeatingConfig {
    pub fn duration_s(&self) -> f64 {
        self.ramp
            .map_or(0.0, |r| r.duration_to(self.target_temperature_c))
            + self.hold_s
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub enabled: bool,
    pub duration_s: f64,
    pub ambient_temperature_c: f64,
    pub htc: f64,
    pub emissivity: Option<f64>,
    pub use_radiation: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_s: 10.0,
            ambient_temperature_c: 25.0,
            htc: 10.0,
            emissivity: None,
            use_radiation: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuenchConfig {
    pub media: QuenchMedia,
    pub agitation: Agitation,
    pub media_temperature_c: f64,
    pub duration_s: f64,
    /// Replaces the media × agitation coefficient.
    pub htc_override: Option<f64>,
    pub use_radiation: bool,
    pub emissivity: f64,
    pub end_condition: EndCondition,
}

impl Default for QuenchConfig {
    fn default() -> Self {
        Self {
            media: QuenchMedia::Water,
            agitation: Agitation::Moderate,
            media_temperature_c: 25.0,
            duration_s: 300.0,
            htc_override: None,
            use_radiation: false,
            emissivity: 0.3,
            end_condition: EndCondition::FixedDuration,
        }
    }
}

impl QuenchConfig {
    pub fn effective_htc(&self) -> f64 {
        self.htc_override
            .unwrap_or_else(|| self.media.base_htc() * self.agitation.multiplier())
    }
}

/// Air cool after tempering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoolDownConfig {
    pub ambient_temperature_c: f64,
    pub htc: f64,
    pub duration_s: f64,
    pub end_condition: EndCondition,
}

impl Default for CoolDownConfig {
    fn default() -> Self {
        Self {
            ambient_temperature_c: 25.0,
            htc: 10.0,
            duration_s: 600.0,
            end_condition: EndCondition::Equilibrium { epsilon_c: 25.0 },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperingConfig {
    pub enabled: bool,
    pub temperature_c: f64,
    pub hold_s: f64,
    pub htc: f64,
    pub emissivity: Option<f64>,
    pub use_radiation: bool,
    pub ramp: Option<FurnaceRamp>,
    pub end_condition: EndCondition,
    pub cool_down: CoolDownConfig,
}

impl Default for TemperingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            temperature_c: 550.0,
            hold_s: 7200.0,
            htc: 25.0,
            emissivity: None,
            use_radiation: true,
            ramp: None,
            end_condition: EndCondition::FixedDuration,
            cool_down: CoolDownConfig::default(),
        }
    }
}

impl TemperingConfig {
    pub fn duration_s(&self) -> f64 {
        self.ramp.map_or(0.0, |r| r.duration_to(self.temperature_c)) + self.hold_s
    }
}

/// One configured stage of the cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhaseConfig {
    Heating(HeatingConfig),
    Transfer(TransferConfig),
    Quenching(QuenchConfig),
    Tempering(TemperingConfig),
}

impl PhaseConfig {
    pub fn kind(&self) -> PhaseKind {
        match self {
            PhaseConfig::Heating(_) => PhaseKind::Heating,
            PhaseConfig::Transfer(_) => PhaseKind::Transfer,
            PhaseConfig::Quenching(_) => PhaseKind::Quenching,
            PhaseConfig::Tempering(_) => PhaseKind::Tempering,
        }
    }

    /// Quenching cannot be switched off.
    pub fn is_enabled(&self) -> bool {
        match self {
            PhaseConfig::Heating(c) => c.enabled,
            PhaseConfig::Transfer(c) => c.enabled,
            PhaseConfig::Quenching(_) => true,
            PhaseConfig::Tempering(c) => c.enabled,
        }
    }
}

pub fn default_phases() -> Vec<PhaseConfig> {
    vec![
        PhaseConfig::Heating(HeatingConfig::default()),
        PhaseConfig::Transfer(TransferConfig::default()),
        PhaseConfig::Quenching(QuenchConfig::default()),
        PhaseConfig::Tempering(TemperingConfig::default()),
    ]
}

/// Where the material properties come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum MaterialDef {
    /// Built-in grade looked up by designation or alias.
    Catalog { grade: String },
    Custom { model: MaterialModel },
}

impl MaterialDef {
    pub fn catalog(grade: impl Into<String>) -> Self {
        MaterialDef::Catalog {
            grade: grade.into(),
        }
    }

    pub fn resolve(&self) -> Result<MaterialModel, MaterialError> {
        match self {
            MaterialDef::Catalog { grade } => catalog::grade(grade),
            MaterialDef::Custom { model } => Ok(model.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "latest_version")]
    pub version: u32,
    pub name: String,
    pub geometry: Geometry,
    pub material: MaterialDef,
    /// Kinetics for the grade; a catalog preset or the defaults when omitted.
    #[serde(default)]
    pub transformation: Option<TransformationParameters>,
    #[serde(default = "default_phases")]
    pub phases: Vec<PhaseConfig>,
    #[serde(default)]
    pub solver: SolverSettings,
    /// Start temperature when heating is disabled.
    #[serde(default = "default_initial_temperature")]
    pub initial_temperature_c: f64,
}

fn latest_version() -> u32 {
    LATEST_VERSION
}

fn default_initial_temperature() -> f64 {
    850.0
}

impl SimulationConfig {
    /// Default cycle for `geometry` and `material`.
    pub fn new(name: impl Into<String>, geometry: Geometry, material: MaterialDef) -> Self {
        Self {
            version: LATEST_VERSION,
            name: name.into(),
            geometry,
            material,
            transformation: None,
            phases: default_phases(),
            solver: SolverSettings::default(),
            initial_temperature_c: default_initial_temperature(),
        }
    }

    pub fn enabled_phases(&self) -> impl Iterator<Item = &PhaseConfig> {
        self.phases.iter().filter(|p| p.is_enabled())
    }

    pub fn phase(&self, kind: PhaseKind) -> Option<&PhaseConfig> {
        self.phases.iter().find(|p| p.kind() == kind)
    }

    pub fn phase_mut(&mut self, kind: PhaseKind) -> Option<&mut PhaseConfig> {
        self.phases.iter_mut().find(|p| p.kind() == kind)
    }

    /// Temperature the first executed stage starts from.
    pub fn start_temperature_c(&self) -> f64 {
        match self.phase(PhaseKind::Heating) {
            Some(PhaseConfig::Heating(h)) if h.enabled => h.initial_temperature_c,
            _ => self.initial_temperature_c,
        }
    }

    /// Explicit parameters, else the catalog preset for the grade, else the
    /// generic defaults.
    pub fn transformation_for(&self, material: &MaterialModel) -> TransformationParameters {
        self.transformation
            .clone()
            .or_else(|| TransformationParameters::for_grade(&material.grade))
            .unwrap_or_default()
    }
}
