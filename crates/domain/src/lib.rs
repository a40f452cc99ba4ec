//! Domain layer - Pure allocation rules with no external dependencies
//!
//! This crate contains:
//! - Entities (ColdRoomPallet, LoadingSheet, LoadingLineItem, Carrier)
//! - Value Objects (PalletId, SheetId, PalletAssignment)
//! - The conflict check behind pallet exclusivity
//! - Store interfaces (traits)
//!
//! Principles:
//! - No dependencies on infrastructure
//! - A pallet is bound to at most one loading sheet
//! - Testable in isolation

pub mod assignment;
pub mod carrier;
pub mod conflict;
pub mod error;
pub mod ids;
pub mod pallet;
pub mod query;
pub mod sheet;
pub mod store;

// Re-export commonly used types
pub use assignment::{BoxQuantity, PalletAssignment};
pub use carrier::Carrier;
pub use conflict::PalletConflict;
pub use error::{AllocationError, ErrorKind};
pub use ids::{CarrierId, MAX_ID_LEN, PalletId, SheetId, SheetIdGenerator};
pub use pallet::ColdRoomPallet;
pub use query::{CarrierFilter, PageRequest, SheetFilter, SheetPage};
pub use sheet::{LoadingLineItem, LoadingSheet, SheetFields};
pub use store::{AllocationStore, AllocationTx};
