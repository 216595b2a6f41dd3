use std::fmt;

use fieldgate_api::{CommandCode, SensorReading};
use time::{Duration, OffsetDateTime};

use crate::policy::ThresholdPolicy;

/// Where a value sits relative to the configured band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Low,
    InBand,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// No open excursion
    #[default]
    Nominal,
    /// Below floor, dwell timer running
    ArmedLow,
    /// Above ceiling, dwell timer running
    ArmedHigh,
    /// Low-side ON issued, latched until a reading reaches nominal
    ActuatedOn,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Nominal => "nominal",
            Phase::ArmedLow => "armed-low",
            Phase::ArmedHigh => "armed-high",
            Phase::ActuatedOn => "actuated-on",
        };

        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// Below floor for at least the dwell time
    LowExcursion { elapsed: Duration },
    /// Above ceiling for at least the dwell time
    HighExcursion { elapsed: Duration },
    /// Latched ON released by a reading at or above nominal
    ReturnToNominal,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::LowExcursion { elapsed } => {
                write!(f, "below floor for {}s", elapsed.whole_seconds())
            }
            Trigger::HighExcursion { elapsed } => {
                write!(f, "above ceiling for {}s", elapsed.whole_seconds())
            }
            Trigger::ReturnToNominal => f.write_str("returned to nominal"),
        }
    }
}

/// Decision produced by a single observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Actuation {
    pub command: CommandCode,
    pub target: f32,
    pub trigger: Trigger,
}

#[derive(Debug, Clone, PartialEq)]
struct Anchor {
    reading: SensorReading,
    started_at: OffsetDateTime,
}

/// Excursion bookkeeping for one monitored quantity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExcursionState {
    phase: Phase,
    anchor: Option<Anchor>,
    last_command: Option<CommandCode>,
}

impl ExcursionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// First out-of-band reading of the open excursion, if any.
    pub fn anchor_reading(&self) -> Option<&SensorReading> {
        self.anchor.as_ref().map(|anchor| &anchor.reading)
    }

    pub fn anchor_time(&self) -> Option<OffsetDateTime> {
        self.anchor.as_ref().map(|anchor| anchor.started_at)
    }

    pub fn last_command(&self) -> Option<CommandCode> {
        self.last_command
    }

    /// Feed one reading, timed at `at`, and return the command to issue, if any.
    pub fn observe(
        &mut self,
        reading: &SensorReading,
        at: OffsetDateTime,
        policy: &ThresholdPolicy,
    ) -> Option<Actuation> {
        let value = reading.value;
        let side = policy.side(value);

        match (self.phase, side) {
            (Phase::ActuatedOn, _) => {
                if value >= policy.nominal() {
                    self.clear();

                    Some(Actuation {
                        command: CommandCode::Off,
                        target: policy.nominal(),
                        trigger: Trigger::ReturnToNominal,
                    })
                } else {
                    None
                }
            }
            (Phase::Nominal, Side::InBand) => None,
            (Phase::ArmedLow | Phase::ArmedHigh, Side::InBand) => {
                // Brief fluctuation: the excursion ended before the dwell time
                self.phase = Phase::Nominal;
                self.anchor = None;
                None
            }
            (Phase::ArmedLow, Side::Low) => {
                let elapsed = self.elapsed(at)?;
                if elapsed < policy.dwell() {
                    return None;
                }

                self.phase = Phase::ActuatedOn;
                self.anchor = None;
                self.last_command = Some(CommandCode::On);

                Some(Actuation {
                    command: CommandCode::On,
                    target: policy.nominal(),
                    trigger: Trigger::LowExcursion { elapsed },
                })
            }
            (Phase::ArmedHigh, Side::High) => {
                let elapsed = self.elapsed(at)?;
                if elapsed < policy.dwell() {
                    return None;
                }

                // High side releases immediately instead of latching
                self.phase = Phase::Nominal;
                self.anchor = None;
                self.last_command = Some(CommandCode::Off);

                Some(Actuation {
                    command: CommandCode::Off,
                    target: policy.nominal(),
                    trigger: Trigger::HighExcursion { elapsed },
                })
            }
            (Phase::Nominal | Phase::ArmedHigh, Side::Low) => {
                self.arm(Phase::ArmedLow, reading, at);
                None
            }
            (Phase::Nominal | Phase::ArmedLow, Side::High) => {
                self.arm(Phase::ArmedHigh, reading, at);
                None
            }
        }
    }

    fn arm(&mut self, phase: Phase, reading: &SensorReading, at: OffsetDateTime) {
        self.phase = phase;
        self.anchor = Some(Anchor {
            reading: reading.clone(),
            started_at: at,
        });
    }

    fn clear(&mut self) {
        self.phase = Phase::Nominal;
        self.anchor = None;
        self.last_command = None;
    }

    fn elapsed(&self, at: OffsetDateTime) -> Option<Duration> {
        self.anchor.as_ref().map(|anchor| at - anchor.started_at)
    }
}
