//! Config extraction errors.

use std::fmt;

/// One setting that could not be read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidSetting {
    /// Dotted key of the setting, empty if the failure is not tied to one.
    pub key: String,
    /// Where the offending value came from: a file path, or the provider name.
    pub origin: String,
    pub message: String,
}

impl fmt::Display for InvalidSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.key.is_empty() {
            write!(f, "`{}` ", self.key)?;
        }
        write!(f, "({}): {}", self.origin, self.message)
    }
}

/// Failed to extract a [`Config`](crate::Config).
///
/// Lists every invalid setting once, in the order figment reported them.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid borderless config:{}", render(.settings))]
pub struct ExtractConfigError {
    pub settings: Vec<InvalidSetting>,
}

impl ExtractConfigError {
    /// Returns the first invalid setting with the given key.
    pub fn setting(&self, key: &str) -> Option<&InvalidSetting> {
        self.settings.iter().find(|s| s.key == key)
    }
}

impl From<figment::Error> for ExtractConfigError {
    fn from(error: figment::Error) -> Self {
        let mut settings: Vec<InvalidSetting> = Vec::with_capacity(error.count());
        for err in error {
            let origin = match &err.metadata {
                Some(meta) => match &meta.source {
                    Some(source) => source.to_string(),
                    None => meta.name.to_string(),
                },
                None => "unknown source".to_string(),
            };
            let setting =
                InvalidSetting { key: err.path.join("."), origin, message: err.kind.to_string() };
            if !settings.contains(&setting) {
                settings.push(setting);
            }
        }
        Self { settings }
    }
}

fn render(settings: &[InvalidSetting]) -> String {
    settings.iter().map(|s| format!("\n  {s}")).collect()
}
