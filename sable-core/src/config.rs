#![forbid(unsafe_code)]

use std::fmt;

use crate::location::Location;

/// How missing access modifiers are treated. Explicit modifiers mean the
/// same thing under every mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessCheckMode {
    /// Every non-local declaration needs a modifier.
    Strict,
    /// A missing modifier means `self`.
    NotSpecifiedRestricted,
    /// A missing modifier means `all`.
    #[default]
    NotSpecifiedUnrestricted,
    /// Access checks are disabled.
    None,
}

impl AccessCheckMode {
    pub const ALL: [AccessCheckMode; 4] = [
        AccessCheckMode::Strict,
        AccessCheckMode::NotSpecifiedRestricted,
        AccessCheckMode::NotSpecifiedUnrestricted,
        AccessCheckMode::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AccessCheckMode::Strict => "strict",
            AccessCheckMode::NotSpecifiedRestricted => "not-specified-restricted",
            AccessCheckMode::NotSpecifiedUnrestricted => "not-specified-unrestricted",
            AccessCheckMode::None => "none",
        }
    }

    /// Whether `notSpecified` reads like `self`.
    pub fn restricts_not_specified(self) -> bool {
        matches!(
            self,
            AccessCheckMode::Strict | AccessCheckMode::NotSpecifiedRestricted
        )
    }
}

impl fmt::Display for AccessCheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CheckerConfig {
    pub access_check_mode: AccessCheckMode,
    pub attachments_enabled: bool,
    /// Location of the program being checked.
    pub location: Location,
}

impl CheckerConfig {
    pub fn with_mode(mut self, mode: AccessCheckMode) -> Self {
        self.access_check_mode = mode;
        self
    }

    pub fn with_attachments(mut self, enabled: bool) -> Self {
        self.attachments_enabled = enabled;
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}
