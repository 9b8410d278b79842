//! In-memory resource source and store helpers shared by the tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde_json::Value;
use vend_core::Resource;
use vend_db::{Database, DbConfig};

use crate::error::SyncError;
use crate::resource_class::ResourceClass;
use crate::source::{Listing, ResourceSource, ResourceStream};

type ListingKey = (ResourceClass, Option<&'static str>);

/// Serves canned JSON resources and records every listing opened.
#[derive(Default)]
pub struct FakeSource {
    resources: HashMap<ListingKey, Vec<Value>>,
    failing: HashMap<ResourceClass, usize>,
    opened: Mutex<Vec<(Listing, Option<DateTime<Utc>>)>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resources returned by the default listing of `class`.
    pub fn with(mut self, class: ResourceClass, resources: Vec<Value>) -> Self {
        self.resources.insert((class, None), resources);
        self
    }

    /// Resources returned by the `state` listing of `class`.
    pub fn with_state(
        mut self,
        class: ResourceClass,
        state: &'static str,
        resources: Vec<Value>,
    ) -> Self {
        self.resources.insert((class, Some(state)), resources);
        self
    }

    /// Makes the default listing of `class` fail after `after` resources.
    pub fn failing(mut self, class: ResourceClass, after: usize) -> Self {
        self.failing.insert(class, after);
        self
    }

    /// Every `(listing, since)` pair opened so far.
    pub fn opened(&self) -> Vec<(Listing, Option<DateTime<Utc>>)> {
        self.opened.lock().unwrap().clone()
    }
}

impl ResourceSource for FakeSource {
    fn open(&self, listing: &Listing, since: Option<DateTime<Utc>>) -> ResourceStream {
        self.opened.lock().unwrap().push((listing.clone(), since));

        let mut items: Vec<Result<Resource, SyncError>> = self
            .resources
            .get(&(listing.class, listing.state))
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(Resource::from_json)
            .map(Ok)
            .collect();

        if listing.state.is_none() {
            if let Some(after) = self.failing.get(&listing.class) {
                items.truncate(*after);
                items.push(Err(SyncError::Fetch {
                    class: listing.class.name().to_string(),
                    reason: "connection reset by peer".into(),
                }));
            }
        }

        stream::iter(items).boxed()
    }
}

pub async fn memory_db() -> Arc<Database> {
    Arc::new(Database::new(DbConfig::in_memory()).await.unwrap())
}
