//! Client-side mirrors of server state.
//!
//! Each slice ([`CartStore`], [`OrderStore`], [`CatalogStore`]) holds the last
//! value the server returned plus a [`RequestState`]. Slices never hold a lock
//! across a network call; they take a ticket when a request is issued and
//! decide on settle whether the response may still be applied.
//!
//! # Response ordering
//!
//! With [`MutationOrdering::Arrival`] responses are applied in the order they
//! land, so two overlapping updates end with whichever response arrived last.
//! [`MutationOrdering::Sequenced`] drops any response older than one already
//! applied to the same mirrored field; a catalog detail fetch never supersedes a
//! listing. In both modes a response issued before a reset
//! (logout, order placed) is dropped.

mod cart;
mod catalog;
mod orders;

pub use cart::CartStore;
pub use catalog::{CatalogStore, PriceBucket};
pub use orders::OrderStore;

use std::collections::BTreeMap;

use crate::config::MutationOrdering;
use crate::error::StoreError;

/// Loading and error flags of a slice, as the view layer reads them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestState {
    /// True while at least one request for this slice is in flight.
    pub loading: bool,
    /// The last failure, until dismissed or superseded by a success.
    pub error: Option<StoreError>,
}

/// The mirrored field a response is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Mirror {
    Cart,
    Listing,
    Entry,
    History,
    CurrentOrder,
}

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    seq: u64,
    epoch: u64,
    mirror: Mirror,
}

/// Request bookkeeping shared by every slice.
///
/// Loading and error state are per slice. Sequencing is per [`Mirror`].
#[derive(Debug)]
pub(crate) struct Lifecycle {
    ordering: MutationOrdering,
    in_flight: u32,
    error: Option<StoreError>,
    epoch: u64,
    next_seq: u64,
    applied: BTreeMap<Mirror, u64>,
}

impl Lifecycle {
    pub(crate) const fn new(ordering: MutationOrdering) -> Self {
        Self {
            ordering,
            in_flight: 0,
            error: None,
            epoch: 0,
            next_seq: 0,
            applied: BTreeMap::new(),
        }
    }

    /// Record that a request writing to `mirror` was issued.
    pub(crate) const fn begin(&mut self, mirror: Mirror) -> Ticket {
        self.in_flight += 1;
        self.next_seq += 1;
        Ticket {
            seq: self.next_seq,
            epoch: self.epoch,
            mirror,
        }
    }

    fn applied_seq(&self, mirror: Mirror) -> u64 {
        self.applied.get(&mirror).copied().unwrap_or(0)
    }

    /// Whether a response for `ticket` may still touch its mirror.
    fn is_current(&self, ticket: Ticket) -> bool {
        if ticket.epoch != self.epoch {
            return false;
        }
        match self.ordering {
            MutationOrdering::Arrival => true,
            MutationOrdering::Sequenced => ticket.seq > self.applied_seq(ticket.mirror),
        }
    }

    /// Settle a successful request. Returns `false` if the response is stale
    /// and must not be applied.
    pub(crate) fn succeed(&mut self, ticket: Ticket) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        if !self.is_current(ticket) {
            return false;
        }
        self.supersede(ticket.mirror, ticket);
        self.error = None;
        true
    }

    /// Settle a successful request whose response is merged into the mirror
    /// rather than replacing it. Only the epoch is checked.
    pub(crate) fn accept(&mut self, ticket: Ticket) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        if ticket.epoch != self.epoch {
            return false;
        }
        self.supersede(ticket.mirror, ticket);
        self.error = None;
        true
    }

    /// Mark `mirror` as holding data at least as new as `ticket`, so older
    /// responses for it are dropped in sequenced mode.
    pub(crate) fn supersede(&mut self, mirror: Mirror, ticket: Ticket) {
        let applied = self.applied.entry(mirror).or_insert(0);
        *applied = (*applied).max(ticket.seq);
    }

    /// Settle a failed request, recording the error unless it is stale.
    pub(crate) fn fail(&mut self, ticket: Ticket, error: StoreError) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.is_current(ticket) {
            self.error = Some(error);
        }
    }

    /// Record a failure that never reached the network.
    pub(crate) fn reject(&mut self, error: StoreError) {
        self.error = Some(error);
    }

    pub(crate) fn clear_error(&mut self) {
        self.error = None;
    }

    /// Start a new epoch. Responses to requests issued before this point are
    /// dropped; requests still in flight keep `loading` set until they settle.
    pub(crate) fn reset(&mut self) {
        self.epoch += 1;
        self.applied.clear();
        self.error = None;
    }

    pub(crate) fn state(&self) -> RequestState {
        RequestState {
            loading: self.in_flight > 0,
            error: self.error.clone(),
        }
    }
}
