use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How much a build action reports, from nothing to everything.
///
/// Variants are ordered; each level includes the output of the ones below.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verbosity {
    Silent,
    #[default]
    StandardInformation,
    BinaryOutputs,
    Commands,
    CommandsAndSpecialOutput,
    CommandsAndOutput,
    All,
}

impl Verbosity {
    pub const ALL_LEVELS: [Verbosity; 7] = [
        Self::Silent,
        Self::StandardInformation,
        Self::BinaryOutputs,
        Self::Commands,
        Self::CommandsAndSpecialOutput,
        Self::CommandsAndOutput,
        Self::All,
    ];

    /// Wire name, e.g. `COMMANDS_AND_OUTPUT`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Silent => "SILENT",
            Self::StandardInformation => "STANDARD_INFORMATION",
            Self::BinaryOutputs => "BINARY_OUTPUTS",
            Self::Commands => "COMMANDS",
            Self::CommandsAndSpecialOutput => "COMMANDS_AND_SPECIAL_OUTPUT",
            Self::CommandsAndOutput => "COMMANDS_AND_OUTPUT",
            Self::All => "ALL",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL_LEVELS
            .into_iter()
            .find(|level| level.as_str() == name)
    }

    pub fn is_silent(self) -> bool {
        self == Self::Silent
    }

    pub fn should_print_standard_information(self) -> bool {
        self >= Self::StandardInformation
    }

    pub fn should_print_binary_run_information(self) -> bool {
        self >= Self::BinaryOutputs
    }

    pub fn should_print_command(self) -> bool {
        self >= Self::Commands
    }

    pub fn should_print_output(self) -> bool {
        self >= Self::CommandsAndOutput
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
