use crate::ids::CarrierId;
use serde::{Deserialize, Serialize};

/// External haulier that can be made responsible for a loading sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carrier {
    pub id: CarrierId,
    pub name: String,
}
