//! # Resource Classes
//!
//! The Vend resource classes the importer knows how to list.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Class          Endpoint         Table            since   state        │
//! │  ─────          ────────         ─────            ─────   ─────        │
//! │  Outlet         outlets          outlets                               │
//! │  Product        products         products          ✓                   │
//! │  Customer       customers        customers         ✓                   │
//! │  PaymentType    payment_types    payment_types                         │
//! │  Register       registers        registers                             │
//! │  RegisterSale   register_sales   register_sales    ✓     VOIDED        │
//! │  Tax            taxes            taxes                                 │
//! │  User           users            users                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use vend_core::policy::class_table_name;

use crate::error::SyncError;

/// A resource class exposed by the Vend API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceClass {
    Outlet,
    Product,
    Customer,
    PaymentType,
    Register,
    RegisterSale,
    Tax,
    User,
}

impl ResourceClass {
    /// Every known class, in default import order.
    pub fn all() -> &'static [ResourceClass] {
        &[
            ResourceClass::Outlet,
            ResourceClass::Product,
            ResourceClass::Customer,
            ResourceClass::PaymentType,
            ResourceClass::Register,
            ResourceClass::RegisterSale,
            ResourceClass::Tax,
            ResourceClass::User,
        ]
    }

    /// The class name as Vend spells it (`RegisterSale`).
    pub fn name(&self) -> &'static str {
        match self {
            ResourceClass::Outlet => "Outlet",
            ResourceClass::Product => "Product",
            ResourceClass::Customer => "Customer",
            ResourceClass::PaymentType => "PaymentType",
            ResourceClass::Register => "Register",
            ResourceClass::RegisterSale => "RegisterSale",
            ResourceClass::Tax => "Tax",
            ResourceClass::User => "User",
        }
    }

    /// Destination table: the plural snake case of the class name.
    pub fn table_name(&self) -> String {
        class_table_name(self.name())
    }

    /// API path under the store's base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            ResourceClass::Outlet => "outlets",
            ResourceClass::Product => "products",
            ResourceClass::Customer => "customers",
            ResourceClass::PaymentType => "payment_types",
            ResourceClass::Register => "registers",
            ResourceClass::RegisterSale => "register_sales",
            ResourceClass::Tax => "taxes",
            ResourceClass::User => "users",
        }
    }

    /// Key of the resource array in a listing response.
    pub fn collection_key(&self) -> &'static str {
        self.endpoint()
    }

    /// True if listings of this class accept the `since` refinement.
    pub fn supports_since(&self) -> bool {
        matches!(
            self,
            ResourceClass::Product | ResourceClass::Customer | ResourceClass::RegisterSale
        )
    }

    /// Lifecycle state whose records the default listing omits.
    ///
    /// Voided sales only show up when asked for by state.
    pub fn state_filter(&self) -> Option<&'static str> {
        match self {
            ResourceClass::RegisterSale => Some("VOIDED"),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceClass {
    type Err = SyncError;

    /// Accepts `RegisterSale`, `register_sale`, `register_sales` or
    /// `registersale`, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        ResourceClass::all()
            .iter()
            .copied()
            .find(|class| {
                class.name().to_lowercase() == wanted
                    || class.endpoint().replace('_', "") == wanted
            })
            .ok_or_else(|| SyncError::UnknownResourceClass(s.to_string()))
    }
}

impl Serialize for ResourceClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ResourceClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
