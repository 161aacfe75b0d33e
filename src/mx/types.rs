/// A mail exchanger for a domain. Lower `priority` is preferred.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MxHost {
    pub host: String,
    pub priority: u16,
}

impl MxHost {
    pub fn new(priority: u16, host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            priority,
        }
    }
}
