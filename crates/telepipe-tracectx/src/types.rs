use std::fmt;

use serde::Serialize;

/// Kind of agent that started the parent side of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParentType {
    App,
    Browser,
    Mobile,
}

impl ParentType {
    /// Labels indexed by wire id.
    pub const ALL: [ParentType; 3] = [ParentType::App, ParentType::Browser, ParentType::Mobile];

    /// Look up a wire id. Ids past the end of the table have no label.
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// Wire id of this parent type.
    pub fn id(self) -> u32 {
        match self {
            ParentType::App => 0,
            ParentType::Browser => 1,
            ParentType::Mobile => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParentType::App => "App",
            ParentType::Browser => "Browser",
            ParentType::Mobile => "Mobile",
        }
    }
}

impl fmt::Display for ParentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an inbound payload reached this process.
///
/// Local metadata only; it never appears in the wire string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum TransportType {
    #[default]
    Unknown,
    #[serde(rename = "HTTP")]
    Http,
    #[serde(rename = "HTTPS")]
    Https,
    Kafka,
    #[serde(rename = "JMS")]
    Jms,
    IronMQ,
    #[serde(rename = "AMQP")]
    Amqp,
    Queue,
    Other,
}

impl TransportType {
    pub const ALL: [TransportType; 9] = [
        TransportType::Unknown,
        TransportType::Http,
        TransportType::Https,
        TransportType::Kafka,
        TransportType::Jms,
        TransportType::IronMQ,
        TransportType::Amqp,
        TransportType::Queue,
        TransportType::Other,
    ];

    /// Normalize a caller-supplied transport name.
    ///
    /// Allowed names pass through, the URL schemes `http` and `https` map to
    /// their transport, anything else is `Unknown`.
    pub fn from_value(value: &str) -> Self {
        if let Some(known) = Self::ALL.into_iter().find(|t| t.as_str() == value) {
            return known;
        }
        match value {
            "http" => TransportType::Http,
            "https" => TransportType::Https,
            _ => TransportType::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransportType::Unknown => "Unknown",
            TransportType::Http => "HTTP",
            TransportType::Https => "HTTPS",
            TransportType::Kafka => "Kafka",
            TransportType::Jms => "JMS",
            TransportType::IronMQ => "IronMQ",
            TransportType::Amqp => "AMQP",
            TransportType::Queue => "Queue",
            TransportType::Other => "Other",
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
