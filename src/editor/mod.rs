//! Block list editing for one realm at a time.
//!
//! New blocks get a pending id and go straight into the realm's `blocks`
//! sequence, so the page renders them like any other block. Form state
//! lives here, outside the store, until a submit succeeds.

use crate::api::{ApiError, ApiResult};
use crate::dispatch::{DispatchError, MutationDispatcher, MutationOutcome, MutationRequest, Ticket};
use crate::models::{fields, BlockKind, BlockValues, FieldErrors, FieldMap, Record, RecordId, REALM_TYPE};
use crate::store::{StoreError, StoreHandle};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("realm {0} is not in the store")]
    UnknownRealm(RecordId),
    #[error("index {index} is out of bounds for {len} blocks")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("block {0} is not in the store")]
    UnknownBlock(RecordId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitError {
    #[error("{0}")]
    Invalid(FieldErrors),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Local state of a block in edit mode.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockForm {
    pub values: BlockValues,
    pub dirty: bool,
    pub errors: FieldErrors,
    /// Error of the last failed submit, shown on this form only.
    pub submit_error: Option<ApiError>,
    pub in_flight: Option<Ticket>,
}

impl BlockForm {
    fn new(values: BlockValues) -> Self {
        Self {
            values,
            dirty: false,
            errors: FieldErrors::default(),
            submit_error: None,
            in_flight: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The form has unsaved edits; call again with `confirmed`.
    NeedsConfirmation,
    /// A never-saved block was taken out of the realm.
    Removed,
    /// Edits to a saved block were thrown away.
    Discarded,
    /// A submit is running; cancelling now is refused.
    InFlight,
}

pub struct BlockListEditor {
    store: StoreHandle,
    dispatcher: MutationDispatcher,
    forms: HashMap<RecordId, BlockForm>,
}

impl BlockListEditor {
    pub fn new(store: StoreHandle) -> Self {
        Self {
            dispatcher: MutationDispatcher::new(store.clone()),
            store,
            forms: HashMap::new(),
        }
    }

    pub fn form(&self, block: &RecordId) -> Option<&BlockForm> {
        self.forms.get(block)
    }

    /// Drops the forms of blocks that left the store, such as unsaved blocks
    /// evicted after their realm was refetched. Forms with a request in
    /// flight stay until it completes. Returns how many were dropped.
    pub fn prune_forms(&mut self) -> usize {
        let before = self.forms.len();
        let store = &self.store;
        self.forms
            .retain(|id, form| form.in_flight.is_some() || store.read(|s| s.contains(id)));
        let dropped = before - self.forms.len();
        if dropped > 0 {
            debug!(dropped, "pruned block forms");
        }
        dropped
    }

    /// Inserts a new block in edit mode at `index`, shifting the blocks at
    /// and after `index` by one. `defaults` override the kind's defaults.
    pub fn insert_block(
        &mut self,
        realm: &RecordId,
        index: usize,
        kind: BlockKind,
        defaults: FieldMap,
    ) -> Result<RecordId, EditorError> {
        let inserted = self.store.apply_local_update(|tx| {
            match tx.get(realm) {
                Some(r) if r.type_tag == REALM_TYPE => {}
                _ => return Err(EditorError::UnknownRealm(realm.clone())),
            }
            let mut blocks = tx.linked_records(realm, fields::BLOCKS)?;
            if index > blocks.len() {
                return Err(EditorError::IndexOutOfBounds {
                    index,
                    len: blocks.len(),
                });
            }

            let id = tx.allocate_pending_id();
            let mut record = Record::new(id.clone(), kind.typename());
            record.fields = kind.default_fields();
            record.fields.extend(defaults);
            record.set(fields::EDIT_MODE, true.into());
            let values = BlockValues::from_record(kind, &record);

            tx.create(record)?;
            blocks.insert(index, id.clone());
            tx.set_linked_records(realm, fields::BLOCKS, blocks)?;
            Ok((id, values))
        });

        match inserted {
            Ok((id, values)) => {
                self.forms.insert(id.clone(), BlockForm::new(values));
                Ok(id)
            }
            Err(e) => {
                error!(realm = %realm, index, error = %e, "insert_block contract violation");
                Err(e)
            }
        }
    }

    /// Toggles the client-only edit flag. Turning it on opens a form with
    /// the block's current values.
    pub fn set_edit_mode(&mut self, block: &RecordId, on: bool) -> Result<(), EditorError> {
        let record = self
            .store
            .record(block)
            .ok_or_else(|| EditorError::UnknownBlock(block.clone()))?;
        self.store
            .apply_local_update(|tx| tx.set_value(block, fields::EDIT_MODE, on))?;

        if on {
            if let Some(kind) = record.block_kind() {
                self.forms
                    .entry(block.clone())
                    .or_insert_with(|| BlockForm::new(BlockValues::from_record(kind, &record)));
            }
        } else {
            self.forms.remove(block);
        }
        Ok(())
    }

    /// Records edited form values.
    pub fn update_form(&mut self, block: &RecordId, values: BlockValues) -> Result<(), EditorError> {
        let form = self
            .forms
            .get_mut(block)
            .ok_or_else(|| EditorError::UnknownBlock(block.clone()))?;
        if form.values != values {
            form.values = values;
            form.dirty = true;
        }
        Ok(())
    }

    /// Validates and hands the block to the dispatcher. On validation
    /// failure only the form changes.
    pub fn submit_block(&mut self, block: &RecordId, values: BlockValues) -> Result<MutationRequest, SubmitError> {
        let form = self
            .forms
            .entry(block.clone())
            .or_insert_with(|| BlockForm::new(values.clone()));
        if form.values != values {
            form.values = values.clone();
            form.dirty = true;
        }

        let input = match values.validate() {
            Ok(input) => input,
            Err(errors) => {
                form.errors = errors.clone();
                return Err(SubmitError::Invalid(errors));
            }
        };
        form.errors = FieldErrors::default();

        let request = self.dispatcher.dispatch(block, input)?;
        form.submit_error = None;
        form.in_flight = Some(request.ticket);
        Ok(request)
    }

    /// Reports the result of a submitted request.
    pub fn complete_submit(&mut self, ticket: Ticket, result: ApiResult<Value>) -> Result<MutationOutcome, DispatchError> {
        let outcome = self.dispatcher.complete(ticket, result)?;
        match &outcome {
            MutationOutcome::Saved { previous, block } => {
                self.forms.remove(previous);
                self.forms.remove(block);
                if let Err(e) = self
                    .store
                    .apply_local_update(|tx| tx.set_value(block, fields::EDIT_MODE, false))
                {
                    error!(block = %block, error = %e, "saved block is missing from the store");
                }
            }
            MutationOutcome::Failed { block, error } => {
                if let Some(form) = self.forms.get_mut(block) {
                    form.in_flight = None;
                    form.submit_error = Some(error.clone());
                }
            }
        }
        Ok(outcome)
    }

    pub fn cancel_edit(&mut self, block: &RecordId, confirmed: bool) -> Result<CancelOutcome, EditorError> {
        if self.dispatcher.is_in_flight(block) {
            return Ok(CancelOutcome::InFlight);
        }
        if !self.store.read(|s| s.contains(block)) {
            return Err(EditorError::UnknownBlock(block.clone()));
        }
        let dirty = self.forms.get(block).map(|f| f.dirty).unwrap_or(false);
        if dirty && !confirmed {
            return Ok(CancelOutcome::NeedsConfirmation);
        }

        if block.is_pending() {
            let realms = self.store.referrers(block, fields::BLOCKS);
            self.store.apply_local_update(|tx| {
                for realm in &realms {
                    let mut blocks = tx.linked_records(realm, fields::BLOCKS)?;
                    blocks.retain(|id| id != block);
                    tx.set_linked_records(realm, fields::BLOCKS, blocks)?;
                }
                tx.delete(block);
                Ok::<_, StoreError>(())
            })?;
            self.forms.remove(block);
            Ok(CancelOutcome::Removed)
        } else {
            self.set_edit_mode(block, false)?;
            Ok(CancelOutcome::Discarded)
        }
    }
}
