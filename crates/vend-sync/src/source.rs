//! # Resource Source Boundary
//!
//! What the fetcher needs from a transport: the listings a class has, and a
//! lazy stream of resources for each one.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  listings(RegisterSale)                                                │
//! │     ├─ Listing { state: None,           supports_since: true }         │
//! │     └─ Listing { state: Some("VOIDED"), supports_since: true }         │
//! │                                                                         │
//! │  open(listing, since) ──► ResourceStream  (nothing is requested until  │
//! │                                            the stream is polled)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use vend_core::Resource;

use crate::error::SyncResult;
use crate::resource_class::ResourceClass;

/// A finite, non-restartable stream of resources.
pub type ResourceStream = BoxStream<'static, SyncResult<Resource>>;

/// One listing of a class: the default one, or one scoped to a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub class: ResourceClass,
    pub state: Option<&'static str>,
    pub supports_since: bool,
}

impl Listing {
    /// The default listing of a class.
    pub fn default_for(class: ResourceClass) -> Self {
        Listing {
            class,
            state: None,
            supports_since: class.supports_since(),
        }
    }

    /// The listing of a class restricted to one lifecycle state.
    pub fn in_state(class: ResourceClass, state: &'static str) -> Self {
        Listing {
            class,
            state: Some(state),
            supports_since: class.supports_since(),
        }
    }

    /// Default listing first, then the state listing if the class has one.
    pub fn all_for(class: ResourceClass) -> Vec<Listing> {
        let mut listings = vec![Listing::default_for(class)];
        if let Some(state) = class.state_filter() {
            listings.push(Listing::in_state(class, state));
        }
        listings
    }
}

/// A transport that yields resources for a class.
pub trait ResourceSource: Send + Sync {
    /// Listings to concatenate for a class, in order.
    fn listings(&self, class: ResourceClass) -> Vec<Listing> {
        Listing::all_for(class)
    }

    /// Opens one listing. `since` is only passed for listings that
    /// support it.
    fn open(&self, listing: &Listing, since: Option<DateTime<Utc>>) -> ResourceStream;
}
