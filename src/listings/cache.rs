//! Reconciliation cache.
//!
//! Holds the last authoritative listing read plus optimistic overlays for
//! operations still in flight. The authoritative part is replaced wholesale
//! on every read; overlays are keyed by operation id and live until the
//! operation resolves.
//!
//! # Reconciliation Rules
//! - An overlay for a rejected operation is retracted.
//! - A confirmed purchase, or a purchase rejected as already sold, latches
//!   the listing as sold. Latches are never cleared by a later read.
//! - Pending creates are reported separately; they have no ledger id yet.
//!   A read holding more matching listings than existed when the create
//!   was applied settles it.
//! - Overlays older than the overlay TTL are dropped on the next read, so
//!   abandoned operations cannot linger.

use arc_swap::ArcSwap;
use dashmap::{DashMap, DashSet};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use alloy::primitives::Address;

use crate::gateway::types::{Listing, ListingId};

/// Default lifetime of an unresolved overlay.
pub const DEFAULT_OVERLAY_TTL: Duration = Duration::from_secs(120);

/// A create submitted but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingCreate {
    pub operation_id: Uuid,
    pub seller: Address,
    pub name: String,
    pub description: String,
    /// Price in base units, decimal string.
    pub price: String,
}

impl PendingCreate {
    fn matches(&self, listing: &Listing) -> bool {
        listing.seller == self.seller
            && listing.name == self.name
            && listing.description == self.description
            && listing.price.to_string() == self.price
    }
}

/// Local effect of an in-flight operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    Purchase(ListingId),
    Create(PendingCreate),
}

struct OverlayEntry {
    overlay: Overlay,
    applied_at: Instant,
    /// Matching listings already present when a create was applied.
    baseline: usize,
}

struct Snapshot {
    listings: Vec<Listing>,
    refreshed_at: Option<Instant>,
}

/// Last-known listing set, subordinate to the next ledger read.
pub struct ReconciliationCache {
    snapshot: ArcSwap<Snapshot>,
    overlays: DashMap<Uuid, OverlayEntry>,
    sold: DashSet<ListingId>,
    overlay_ttl: Duration,
}

impl ReconciliationCache {
    pub fn new() -> Self {
        Self::with_overlay_ttl(DEFAULT_OVERLAY_TTL)
    }

    pub fn with_overlay_ttl(overlay_ttl: Duration) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot {
                listings: Vec::new(),
                refreshed_at: None,
            }),
            overlays: DashMap::new(),
            sold: DashSet::new(),
            overlay_ttl,
        }
    }

    /// Install a fresh authoritative read.
    pub fn replace(&self, listings: Vec<Listing>) {
        for listing in listings.iter().filter(|l| l.is_sold) {
            self.sold.insert(listing.id);
        }

        let ttl = self.overlay_ttl;
        self.overlays.retain(|operation_id, entry| {
            if entry.applied_at.elapsed() >= ttl {
                tracing::debug!(operation = %operation_id, "Unresolved overlay expired");
                return false;
            }
            match &entry.overlay {
                // Already reflected by the ledger.
                Overlay::Purchase(id) => !listings.iter().any(|l| l.id == *id && l.is_sold),
                Overlay::Create(create) => {
                    listings.iter().filter(|l| create.matches(l)).count() <= entry.baseline
                }
            }
        });

        tracing::debug!(
            listings = listings.len(),
            overlays = self.overlays.len(),
            "Listing cache replaced"
        );
        self.snapshot.store(Arc::new(Snapshot {
            listings,
            refreshed_at: Some(Instant::now()),
        }));
    }

    /// Record the local effect of a submitted operation.
    pub fn apply_optimistic(&self, operation_id: Uuid, overlay: Overlay) {
        let baseline = match &overlay {
            Overlay::Create(create) => self
                .snapshot
                .load()
                .listings
                .iter()
                .filter(|l| create.matches(l))
                .count(),
            Overlay::Purchase(_) => 0,
        };
        self.overlays.insert(
            operation_id,
            OverlayEntry {
                overlay,
                applied_at: Instant::now(),
                baseline,
            },
        );
    }

    /// Settle an operation's overlay. A confirmed purchase latches its
    /// listing as sold; any rejected operation simply loses its overlay.
    pub fn resolve(&self, operation_id: Uuid, confirmed: bool) {
        let Some((_, entry)) = self.overlays.remove(&operation_id) else {
            return;
        };
        match entry.overlay {
            Overlay::Purchase(id) if confirmed => {
                self.sold.insert(id);
            }
            Overlay::Purchase(id) => {
                tracing::debug!(operation = %operation_id, listing = %id, "Optimistic purchase retracted");
            }
            Overlay::Create(_) => {}
        }
    }

    /// Latch `id` as sold.
    pub fn mark_sold(&self, id: ListingId) {
        if self.sold.insert(id) {
            tracing::debug!(listing = %id, "Listing latched as sold");
        }
    }

    /// Whether `id` is known to be sold, from a read or a settled purchase.
    pub fn known_sold(&self, id: ListingId) -> bool {
        self.sold.contains(&id)
    }

    /// Whether a purchase of `id` is in flight from this client.
    pub fn purchase_in_flight(&self, id: ListingId) -> bool {
        self.overlays
            .iter()
            .any(|entry| matches!(&entry.value().overlay, Overlay::Purchase(target) if *target == id))
    }

    /// The last authoritative read, unmodified.
    pub fn authoritative(&self) -> Vec<Listing> {
        self.snapshot.load().listings.clone()
    }

    /// One listing from the merged view.
    pub fn get(&self, id: ListingId) -> Option<Listing> {
        self.listings().into_iter().find(|l| l.id == id)
    }

    /// The merged view: authoritative listings with sold latches and
    /// in-flight purchases applied.
    pub fn listings(&self) -> Vec<Listing> {
        let snapshot = self.snapshot.load();
        snapshot
            .listings
            .iter()
            .cloned()
            .map(|mut listing| {
                if !listing.is_sold
                    && (self.known_sold(listing.id) || self.purchase_in_flight(listing.id))
                {
                    listing.is_sold = true;
                }
                listing
            })
            .collect()
    }

    pub fn pending_creates(&self) -> Vec<PendingCreate> {
        let mut creates: Vec<PendingCreate> = self
            .overlays
            .iter()
            .filter_map(|entry| match &entry.value().overlay {
                Overlay::Create(create) => Some(create.clone()),
                Overlay::Purchase(_) => None,
            })
            .collect();
        creates.sort_by_key(|c| c.operation_id);
        creates
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    /// When the last authoritative read was installed.
    pub fn refreshed_at(&self) -> Option<Instant> {
        self.snapshot.load().refreshed_at
    }
}

impl Default for ReconciliationCache {
    fn default() -> Self {
        Self::new()
    }
}
