use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, Quantity};

/// Unit of measure an item is counted in.
///
/// Integral units only ever hold whole quantities; fractional units accept any
/// decimal precision.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitOfMeasure {
    Piece,
    Pack,
    Dozen,
    Gram,
    Kilogram,
    Litre,
    Metre,
}

impl UnitOfMeasure {
    pub const ALL: [UnitOfMeasure; 7] = [
        UnitOfMeasure::Piece,
        UnitOfMeasure::Pack,
        UnitOfMeasure::Dozen,
        UnitOfMeasure::Gram,
        UnitOfMeasure::Kilogram,
        UnitOfMeasure::Litre,
        UnitOfMeasure::Metre,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UnitOfMeasure::Piece => "piece",
            UnitOfMeasure::Pack => "pack",
            UnitOfMeasure::Dozen => "dozen",
            UnitOfMeasure::Gram => "gram",
            UnitOfMeasure::Kilogram => "kilogram",
            UnitOfMeasure::Litre => "litre",
            UnitOfMeasure::Metre => "metre",
        }
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            UnitOfMeasure::Piece | UnitOfMeasure::Pack | UnitOfMeasure::Dozen
        )
    }

    /// Reject quantities this unit cannot represent. Never rounds.
    pub fn ensure_precision(self, subject: &str, quantity: Quantity) -> DomainResult<()> {
        if self.is_integral() && !quantity.is_whole() {
            return Err(DomainError::malformed(
                subject,
                format!("{quantity} is not a whole number of {}", self.as_str()),
            ));
        }
        Ok(())
    }
}

impl core::fmt::Display for UnitOfMeasure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitOfMeasure {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "piece" | "pieces" | "pc" | "pcs" => Ok(UnitOfMeasure::Piece),
            "pack" | "packs" | "pkt" => Ok(UnitOfMeasure::Pack),
            "dozen" | "dz" => Ok(UnitOfMeasure::Dozen),
            "gram" | "grams" | "g" => Ok(UnitOfMeasure::Gram),
            "kilogram" | "kilograms" | "kg" => Ok(UnitOfMeasure::Kilogram),
            "litre" | "liter" | "litres" | "liters" | "l" => Ok(UnitOfMeasure::Litre),
            "metre" | "meter" | "metres" | "meters" | "m" => Ok(UnitOfMeasure::Metre),
            other => Err(DomainError::validation(format!(
                "unknown unit of measure '{other}'"
            ))),
        }
    }
}
