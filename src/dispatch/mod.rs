//! Sends block edits to the server and folds the answers back into the
//! store.
//!
//! Whether an edit is a create or an update follows from the block id
//! alone: pending ids have never been seen by the server.

pub mod realm;

use crate::api::operations::{self, Operation};
use crate::api::{normalize, ApiError, ApiResult};
use crate::models::{fields, BlockInput, RecordId};
use crate::store::{StoreError, StoreHandle};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("block {0} already has a request in flight")]
    AlreadyInFlight(RecordId),
    #[error("block {0} does not exist")]
    UnknownBlock(RecordId),
    #[error("pending block {0} does not belong to a realm")]
    Orphaned(RecordId),
    #[error("realm {0} has not been saved yet")]
    UnsavedRealm(RecordId),
    #[error("no request in flight for this ticket")]
    UnknownTicket,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

#[derive(Clone, Debug, PartialEq)]
pub enum MutationKind {
    Create {
        realm: RecordId,
        index: usize,
        block: BlockInput,
    },
    Update {
        id: RecordId,
        set: BlockInput,
    },
}

/// A mutation the caller has to send, then report back with
/// [`MutationDispatcher::complete`].
#[derive(Clone, Debug, PartialEq)]
pub struct MutationRequest {
    pub ticket: Ticket,
    pub block: RecordId,
    pub kind: MutationKind,
}

impl MutationRequest {
    pub fn operation(&self) -> Operation {
        match &self.kind {
            MutationKind::Create { realm, index, block } => {
                operations::create_block(realm.as_persisted().unwrap_or_default(), *index, block)
            }
            MutationKind::Update { id, set } => {
                operations::update_block(id.as_persisted().unwrap_or_default(), set)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MutationOutcome {
    /// `block` is the id the block has from now on.
    Saved { previous: RecordId, block: RecordId },
    /// The store was not touched.
    Failed { block: RecordId, error: ApiError },
}

pub struct MutationDispatcher {
    store: StoreHandle,
    in_flight: BTreeMap<Ticket, MutationRequest>,
    next_ticket: u64,
}

impl MutationDispatcher {
    pub fn new(store: StoreHandle) -> Self {
        Self {
            store,
            in_flight: BTreeMap::new(),
            next_ticket: 0,
        }
    }

    pub fn is_in_flight(&self, block: &RecordId) -> bool {
        self.in_flight.values().any(|r| &r.block == block)
    }

    pub fn dispatch(&mut self, block: &RecordId, input: BlockInput) -> Result<MutationRequest, DispatchError> {
        if self.is_in_flight(block) {
            return Err(DispatchError::AlreadyInFlight(block.clone()));
        }
        if self.store.record(block).is_none() {
            return Err(DispatchError::UnknownBlock(block.clone()));
        }

        let kind = match block {
            RecordId::Persisted(_) => MutationKind::Update {
                id: block.clone(),
                set: input,
            },
            RecordId::Pending(_) => {
                let (realm, index) = self.position(block)?;
                if realm.is_pending() {
                    return Err(DispatchError::UnsavedRealm(realm));
                }
                MutationKind::Create {
                    realm,
                    index,
                    block: input,
                }
            }
        };

        self.next_ticket += 1;
        let request = MutationRequest {
            ticket: Ticket(self.next_ticket),
            block: block.clone(),
            kind,
        };
        debug!(block = %block, create = matches!(request.kind, MutationKind::Create { .. }), "dispatch");
        self.in_flight.insert(request.ticket, request.clone());
        Ok(request)
    }

    /// Realm of a block and its index among the realm's persisted blocks,
    /// which is the only list the server knows.
    fn position(&self, block: &RecordId) -> Result<(RecordId, usize), DispatchError> {
        let orphaned = || DispatchError::Orphaned(block.clone());
        let realm = self
            .store
            .referrers(block, fields::BLOCKS)
            .into_iter()
            .next()
            .ok_or_else(orphaned)?;
        let index = self
            .store
            .record(&realm)
            .and_then(|r| {
                let ids = r.links(fields::BLOCKS)?;
                let slot = ids.iter().position(|id| id == block)?;
                Some(ids[..slot].iter().filter(|id| !id.is_pending()).count())
            })
            .ok_or_else(orphaned)?;
        Ok((realm, index))
    }

    pub fn complete(&mut self, ticket: Ticket, result: ApiResult<Value>) -> Result<MutationOutcome, DispatchError> {
        let request = self.in_flight.remove(&ticket).ok_or(DispatchError::UnknownTicket)?;
        let block = request.block.clone();

        let applied = result
            .and_then(|data| normalize(&data).map_err(ApiError::from))
            .and_then(|n| match &request.kind {
                MutationKind::Update { .. } => {
                    self.store.apply_server_snapshot(n.snapshot);
                    Ok(block.clone())
                }
                MutationKind::Create { realm, index, block: input } => {
                    self.reconcile_create(&block, realm, *index, input, n)
                }
            });

        match applied {
            Ok(saved) => {
                info!(previous = %block, block = %saved, "block saved");
                Ok(MutationOutcome::Saved {
                    previous: block,
                    block: saved,
                })
            }
            Err(error) => {
                warn!(block = %block, error = %error, "block mutation failed");
                Ok(MutationOutcome::Failed { block, error })
            }
        }
    }

    /// Swaps the pending id for the persisted one at the slot it occupies
    /// now, in one local transaction. The local `blocks` order wins over the
    /// order in the response.
    fn reconcile_create(
        &self,
        pending: &RecordId,
        realm: &RecordId,
        index: usize,
        input: &BlockInput,
        normalized: crate::api::Normalized,
    ) -> ApiResult<RecordId> {
        let field = operations::create_block_field(input);
        let persisted = normalized
            .root
            .get(field)
            .and_then(|v| v.as_link())
            .and_then(|realm_id| normalized.snapshot.get(realm_id))
            .and_then(|r| r.links(fields::BLOCKS))
            .and_then(|ids| ids.get(index))
            .cloned()
            .ok_or_else(|| ApiError::parse(format!("{field} response has no block at index {index}")))?;

        let mut snapshot = normalized.snapshot;
        for record in &mut snapshot.records {
            if &record.id == realm {
                record.fields.remove(fields::BLOCKS);
            }
        }

        self.store
            .apply_local_update(|tx| {
                let mut blocks = tx.linked_records(realm, fields::BLOCKS)?;
                match blocks.iter().position(|id| id == pending) {
                    Some(slot) => blocks[slot] = persisted.clone(),
                    None => error!(block = %pending, "pending block vanished before reconciliation"),
                }
                tx.set_linked_records(realm, fields::BLOCKS, blocks)?;
                tx.delete(pending);
                tx.merge_snapshot(snapshot);
                Ok::<_, StoreError>(())
            })
            .map_err(ApiError::parse)?;
        Ok(persisted)
    }
}
