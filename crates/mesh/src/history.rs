//! Action log: an ordered history of composite actions with a cursor
//! separating done from undone entries.
//!
//! Callers about to perform a multi-step mutation open a composite, append
//! every topological action they perform, and seal the composite into the
//! log on completion — or cancel it (or [`History::drop_last`] a sealed
//! entry) when the gesture produced no net effect. Undoing with an empty
//! history is a benign no-op, not an error; opening two composites at once
//! is a caller bug and is reported as such.
//!
//! Ids deleted by logged actions stay retired in the mesh store until the
//! referencing entry leaves the log (truncation of the undone suffix, a
//! dropped entry, or clearing), at which point they return to the reuse
//! pools.

use tracing::debug;

use crate::actions::Action;
use crate::half_edge::{HalfEdgeMesh, MeshError};

/// Caller invoked an operation in an invalid state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("a composite action is already open")]
    CompositeAlreadyOpen,
    #[error("no composite action is open")]
    CompositeNotOpen,
}

/// Errors from action log operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HistoryError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// An ordered sequence of actions applied as one user-visible step; atomic
/// for undo/redo purposes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeAction {
    actions: Vec<Action>,
}

impl CompositeAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl From<Vec<Action>> for CompositeAction {
    fn from(actions: Vec<Action>) -> Self {
        Self { actions }
    }
}

/// Linear undo/redo history for one mesh. No branching: pushing after undos
/// discards the undone suffix.
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<CompositeAction>,
    /// Entries before the cursor are applied, entries after it are undone
    cursor: usize,
    open: Option<CompositeAction>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sealed entries (applied and undone).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    pub fn has_open_composite(&self) -> bool {
        self.open.is_some()
    }

    /// Open a composite buffer for the next gesture.
    pub fn begin_composite(&mut self) -> Result<(), PreconditionError> {
        if self.open.is_some() {
            return Err(PreconditionError::CompositeAlreadyOpen);
        }
        self.open = Some(CompositeAction::new());
        Ok(())
    }

    /// Append an already-applied action to the open composite.
    pub fn record(&mut self, action: Action) -> Result<(), PreconditionError> {
        match self.open.as_mut() {
            Some(composite) => {
                composite.push(action);
                Ok(())
            }
            None => Err(PreconditionError::CompositeNotOpen),
        }
    }

    /// Seal the open composite into the log. Returns whether an entry was
    /// pushed; an empty composite is discarded (the gesture never touched
    /// the mesh).
    pub fn seal_composite(&mut self, mesh: &mut HalfEdgeMesh) -> Result<bool, PreconditionError> {
        let composite = self.open.take().ok_or(PreconditionError::CompositeNotOpen)?;
        if composite.is_empty() {
            debug!("seal_composite: empty composite discarded");
            return Ok(false);
        }
        self.push(composite, mesh);
        Ok(true)
    }

    /// Discard the open composite buffer without touching the log. Only
    /// valid for gestures that produced no net effect — the buffered
    /// actions are dropped, not inverted.
    pub fn cancel_composite(&mut self) -> Result<(), PreconditionError> {
        match self.open.take() {
            Some(composite) => {
                debug!("cancel_composite: {} actions discarded", composite.len());
                Ok(())
            }
            None => Err(PreconditionError::CompositeNotOpen),
        }
    }

    /// Append a composite at the cursor, discarding any previously-undone
    /// suffix; the cursor advances past the new entry.
    pub fn push(&mut self, composite: CompositeAction, mesh: &mut HalfEdgeMesh) {
        if self.cursor < self.entries.len() {
            debug!(
                "push: truncating {} undone entries",
                self.entries.len() - self.cursor
            );
            for entry in self.entries.drain(self.cursor..) {
                release_created(&entry, mesh);
            }
        }
        debug!("push: composite with {} actions", composite.len());
        self.entries.push(composite);
        self.cursor = self.entries.len();
    }

    /// Apply the inverse of the entry before the cursor (its actions in
    /// reverse recorded order). Returns false on empty history.
    pub fn undo(&mut self, mesh: &mut HalfEdgeMesh) -> Result<bool, HistoryError> {
        if self.open.is_some() {
            return Err(PreconditionError::CompositeAlreadyOpen.into());
        }
        if self.cursor == 0 {
            debug!("undo: nothing to undo");
            return Ok(false);
        }
        self.cursor -= 1;
        let entry = &self.entries[self.cursor];
        debug!("undo: entry {} ({} actions)", self.cursor, entry.len());
        for action in entry.actions().iter().rev() {
            action.undo(mesh)?;
        }
        mesh.recalculate_normals();
        Ok(true)
    }

    /// Re-apply the entry at the cursor (forward recorded order). Returns
    /// false when there is nothing to redo.
    pub fn redo(&mut self, mesh: &mut HalfEdgeMesh) -> Result<bool, HistoryError> {
        if self.open.is_some() {
            return Err(PreconditionError::CompositeAlreadyOpen.into());
        }
        if self.cursor == self.entries.len() {
            debug!("redo: nothing to redo");
            return Ok(false);
        }
        let entry = &self.entries[self.cursor];
        debug!("redo: entry {} ({} actions)", self.cursor, entry.len());
        for action in entry.actions() {
            action.redo(mesh)?;
        }
        mesh.recalculate_normals();
        self.cursor += 1;
        Ok(true)
    }

    /// Remove the most recently pushed entry without applying its inverse —
    /// for tentative strokes that turned out to change nothing worth
    /// keeping. Returns false on empty history.
    pub fn drop_last(&mut self, mesh: &mut HalfEdgeMesh) -> bool {
        let Some(entry) = self.entries.pop() else {
            return false;
        };
        if self.cursor > self.entries.len() {
            // The dropped entry was applied: its deletions are now permanent
            self.cursor = self.entries.len();
            release_deleted(&entry, mesh);
        } else {
            // The dropped entry was undone: its creations no longer exist
            release_created(&entry, mesh);
        }
        debug!("drop_last: entry with {} actions removed", entry.len());
        true
    }

    /// Forget the entire history, returning all retired ids to the mesh's
    /// reuse pools.
    pub fn clear(&mut self, mesh: &mut HalfEdgeMesh) {
        for (index, entry) in self.entries.drain(..).enumerate() {
            if index < self.cursor {
                release_deleted(&entry, mesh);
            } else {
                release_created(&entry, mesh);
            }
        }
        self.cursor = 0;
        self.open = None;
    }
}

fn release_created(entry: &CompositeAction, mesh: &mut HalfEdgeMesh) {
    for action in entry.actions() {
        let (vertices, faces) = action.created_ids();
        for v in vertices {
            mesh.release_vertex_id(v);
        }
        for f in faces {
            mesh.release_face_id(f);
        }
    }
}

fn release_deleted(entry: &CompositeAction, mesh: &mut HalfEdgeMesh) {
    for action in entry.actions() {
        let (vertices, faces) = action.deleted_ids();
        for v in vertices {
            mesh.release_vertex_id(v);
        }
        for f in faces {
            mesh.release_face_id(f);
        }
    }
}
