use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Document profile selecting the chunker, the system prompt and the cache scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UseCase {
    #[default]
    Study,
    Invoice,
}

impl UseCase {
    pub fn as_str(self) -> &'static str {
        match self {
            UseCase::Study => "study",
            UseCase::Invoice => "invoice",
        }
    }
}

impl fmt::Display for UseCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UseCase {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "study" => Ok(UseCase::Study),
            "invoice" => Ok(UseCase::Invoice),
            other => Err(AppError::Validation(format!(
                "Unsupported use_case '{other}'. Expected 'study' or 'invoice'."
            ))),
        }
    }
}
