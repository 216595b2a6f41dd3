use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Logical name of a data kind, mapped one to one onto a wire topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceName {
    /// Sensor readings published by constrained devices
    CdaSensorMsg,
    /// Actuator commands issued to constrained devices
    CdaActuatorCmd,
    /// Acknowledgments of executed actuator commands
    CdaActuatorResponse,
    /// Utilisation samples published by constrained devices
    CdaSystemPerfMsg,
    /// Utilisation samples of the gateway itself
    GdaSystemPerfMsg,
    /// Management status reports of the gateway
    GdaMgmtStatusMsg,
}

static TOPIC_INDEX: LazyLock<HashMap<&'static str, ResourceName>> = LazyLock::new(|| {
    ResourceName::ALL
        .iter()
        .map(|resource| (resource.topic(), *resource))
        .collect()
});

impl ResourceName {
    pub const ALL: [ResourceName; 6] = [
        ResourceName::CdaSensorMsg,
        ResourceName::CdaActuatorCmd,
        ResourceName::CdaActuatorResponse,
        ResourceName::CdaSystemPerfMsg,
        ResourceName::GdaSystemPerfMsg,
        ResourceName::GdaMgmtStatusMsg,
    ];

    pub fn topic(&self) -> &'static str {
        match self {
            ResourceName::CdaSensorMsg => "PIOT/ConstrainedDevice/SensorMsg",
            ResourceName::CdaActuatorCmd => "PIOT/ConstrainedDevice/ActuatorCmd",
            ResourceName::CdaActuatorResponse => "PIOT/ConstrainedDevice/ActuatorResponse",
            ResourceName::CdaSystemPerfMsg => "PIOT/ConstrainedDevice/SystemPerfMsg",
            ResourceName::GdaSystemPerfMsg => "PIOT/GatewayDevice/SystemPerfMsg",
            ResourceName::GdaMgmtStatusMsg => "PIOT/GatewayDevice/MgmtStatusMsg",
        }
    }

    pub fn from_topic(topic: &str) -> Option<Self> {
        TOPIC_INDEX.get(topic).copied()
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.topic())
    }
}
