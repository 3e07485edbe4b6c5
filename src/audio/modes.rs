use crossbeam::atomic::AtomicCell;
use parking_lot::Mutex;

use super::Sample;

const RAISED_SEMITONES: Sample = 6.;
const LOWERED_SEMITONES: Sample = -6.;
const CROSS_GENDER_SEMITONES: Sample = 10.;

/// Largest custom shift accepted, either direction (two octaves)
const CUSTOM_LIMIT: Sample = 24.;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PitchMode {
    Off,
    Raised,
    Lowered,
    CrossGender(GenderDirection),
    Custom(Sample),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenderDirection {
    MaleToFemale,
    FemaleToMale,
}

impl PitchMode {
    pub fn semitones(&self) -> Sample {
        match self {
            Self::Off => 0.,
            Self::Raised => RAISED_SEMITONES,
            Self::Lowered => LOWERED_SEMITONES,
            Self::CrossGender(GenderDirection::MaleToFemale) => CROSS_GENDER_SEMITONES,
            Self::CrossGender(GenderDirection::FemaleToMale) => -CROSS_GENDER_SEMITONES,
            Self::Custom(semitones) => *semitones,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Off => "off (passthrough)".to_string(),
            Self::Raised => format!("raised ({:+} semitones)", RAISED_SEMITONES),
            Self::Lowered => format!("lowered ({:+} semitones)", LOWERED_SEMITONES),
            Self::CrossGender(GenderDirection::MaleToFemale) => {
                format!("cross-gender, male to female ({:+} semitones)", CROSS_GENDER_SEMITONES)
            }
            Self::CrossGender(GenderDirection::FemaleToMale) => {
                format!("cross-gender, female to male ({:+} semitones)", -CROSS_GENDER_SEMITONES)
            }
            Self::Custom(semitones) => format!("custom ({:+.1} semitones)", semitones),
        }
    }
}

/// Holds the active transformation mode for one session.
///
/// Mode changes come from the command thread while every dispatch reads the
/// effective offset, so the offset is kept in an atomic cell. A reader sees
/// either the old or the new value, never a torn one.
pub struct PitchControl {
    mode: Mutex<PitchMode>,
    semitones: AtomicCell<Sample>,
}

impl PitchControl {
    pub fn new() -> Self {
        Self {
            mode: Mutex::new(PitchMode::Off),
            semitones: AtomicCell::new(0.),
        }
    }

    pub fn set_off(&self) {
        self.set_mode(PitchMode::Off);
    }

    pub fn set_raised(&self) {
        self.set_mode(PitchMode::Raised);
    }

    pub fn set_lowered(&self) {
        self.set_mode(PitchMode::Lowered);
    }

    pub fn set_cross_gender(&self, direction: GenderDirection) {
        self.set_mode(PitchMode::CrossGender(direction));
    }

    pub fn set_custom(&self, semitones: Sample) {
        self.set_mode(PitchMode::Custom(
            semitones.clamp(-CUSTOM_LIMIT, CUSTOM_LIMIT),
        ));
    }

    pub fn mode(&self) -> PitchMode {
        *self.mode.lock()
    }

    /// Snapshot of the effective shift, safe from any thread
    pub fn semitones(&self) -> Sample {
        self.semitones.load()
    }

    fn set_mode(&self, new_mode: PitchMode) {
        let mut mode = self.mode.lock();

        *mode = new_mode;
        self.semitones.store(new_mode.semitones());
    }
}

impl Default for PitchControl {
    fn default() -> Self {
        Self::new()
    }
}
