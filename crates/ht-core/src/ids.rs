use core::fmt;
use core::num::NonZeroU32;

/// Compact identifier for a simulation record.
///
/// - `u32` keeps memory small
/// - `NonZero` enables `Option<SimulationId>` to be pointer-optimized
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SimulationId(NonZeroU32);

impl SimulationId {
    /// Create an id from a 0-based sequence number by storing seq+1.
    pub fn from_index(index: u32) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index))
    }

    /// Parse the 1-based display form used by front ends.
    pub fn from_display(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    /// Recover the 0-based sequence number.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }

    /// 1-based number shown to users.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Debug for SimulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimulationId({})", self.get())
    }
}

impl fmt::Display for SimulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}
