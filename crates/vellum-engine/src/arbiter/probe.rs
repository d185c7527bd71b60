/// Arbiter configuration.
#[derive(Debug, Clone)]
pub struct ArbiterConfig {
    /// Driver-string prefixes of hardware that supports only one live context at a time.
    pub limited_driver_prefixes: Vec<String>,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            limited_driver_prefixes: vec!["Q3Dimension MSM7500 ".to_string()],
        }
    }
}

/// Result of the one-time driver capability probe.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Capability {
    /// No context has existed yet; arbitration is exclusive until probed.
    Unprobed,
    /// The driver has been inspected.
    Probed { multi_context: bool },
}

impl Capability {
    pub fn is_probed(self) -> bool {
        matches!(self, Capability::Probed { .. })
    }

    /// Whether several render threads may hold a context at the same time.
    pub fn multi_context(self) -> bool {
        matches!(self, Capability::Probed { multi_context: true })
    }

    /// Whether the probe found hardware limited to a single context.
    pub fn limited(self) -> bool {
        matches!(self, Capability::Probed { multi_context: false })
    }
}

impl ArbiterConfig {
    /// Classifies a driver string.
    pub(crate) fn classify(&self, driver: &str) -> Capability {
        let limited = self
            .limited_driver_prefixes
            .iter()
            .any(|prefix| driver.starts_with(prefix.as_str()));

        Capability::Probed {
            multi_context: !limited,
        }
    }
}
