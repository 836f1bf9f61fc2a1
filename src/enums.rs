use serde::{Deserialize, Serialize};

use crate::engine::types::AdherenceError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = AdherenceError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(AdherenceError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// Dispense status vocabulary of the upstream clinical store.
str_enum!(DispenseStatus {
    Preparation => "preparation",
    InProgress => "in-progress",
    Cancelled => "cancelled",
    OnHold => "on-hold",
    Completed => "completed",
    EnteredInError => "entered-in-error",
    Stopped => "stopped",
    Declined => "declined",
    Unknown => "unknown",
});

str_enum!(AdherenceMeasure {
    Statins => "MAC",
    Diabetes => "MAD",
    RasAntagonists => "MAH",
});

impl DispenseStatus {
    /// Parse leniently: surrounding whitespace and letter case are ignored.
    pub fn parse(raw: &str) -> Result<Self, AdherenceError> {
        raw.trim().to_ascii_lowercase().parse()
    }
}

impl AdherenceMeasure {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Statins => "Medication Adherence for Cholesterol (Statins)",
            Self::Diabetes => "Medication Adherence for Diabetes Medications",
            Self::RasAntagonists => "Medication Adherence for Hypertension (RAS Antagonists)",
        }
    }

    pub fn all() -> &'static [AdherenceMeasure] {
        &[Self::Statins, Self::Diabetes, Self::RasAntagonists]
    }
}
