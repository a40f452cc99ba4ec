use crate::conflict::PalletConflict;
use serde::Serialize;
use thiserror::Error;

/// Broad category of an allocation failure.
///
/// Callers branch on this instead of on individual variants: retry
/// (`Infrastructure`), fix input (`Validation`), resolve a conflict
/// (`Conflict`) or stop (`NotFound`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Infrastructure,
}

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationError {
    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("At least one pallet assignment is required")]
    NoPallets,

    #[error("Pallet {0} appears more than once in the submission")]
    DuplicatePallet(String),

    #[error("{} pallet(s) already assigned to another loading sheet", .0.len())]
    PalletConflict(Vec<PalletConflict>),

    #[error("Loading sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Carrier not found: {0}")]
    CarrierNotFound(String),

    #[error("Pallets not found: {}", .0.join(", "))]
    PalletsNotFound(Vec<String>),

    #[error("Generated identifier {0} already exists")]
    IdCollision(String),

    #[error("Transaction aborted by the store, try again: {0}")]
    Transient(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AllocationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidId(_)
            | Self::MissingField(_)
            | Self::InvalidField { .. }
            | Self::NoPallets
            | Self::DuplicatePallet(_) => ErrorKind::Validation,
            Self::PalletConflict(_) => ErrorKind::Conflict,
            Self::SheetNotFound(_) | Self::CarrierNotFound(_) | Self::PalletsNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::IdCollision(_) | Self::Transient(_) | Self::Storage(_) => {
                ErrorKind::Infrastructure
            }
        }
    }

    /// True when repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Infrastructure
    }

    pub fn conflicts(&self) -> Option<&[PalletConflict]> {
        match self {
            Self::PalletConflict(conflicts) => Some(conflicts),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AllocationError>;
