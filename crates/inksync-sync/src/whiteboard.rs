//! One client's whiteboard: live collection, undo history, the gesture in
//! progress and the sync engine, driven by explicit [`Command`]s.
//!
//! All mutation happens on the caller's thread, one command or inbound
//! frame at a time. Every committed command records exactly one history
//! snapshot and publishes exactly one delta; intermediate pointer moves only
//! reshape the draft.

use std::path::Path;
use std::time::Instant;

use inksync_core::{
    Collection, Draft, Element, ElementId, ElementPatch, MoveCoalescer, Point, Style, Tool,
};
use inksync_session::{ClientId, History, Session};
use tracing::{debug, info};

use crate::channel::Channel;
use crate::config::SyncConfig;
use crate::engine::{PollSummary, SyncEngine};
use crate::error::WhiteboardError;
use crate::protocol::{Delta, DeltaKind};

/// Input to a whiteboard
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    PointerDown { tool: Tool, at: Point },
    PointerMove { at: Point },
    PointerUp,
    /// Abandon the gesture in progress without committing
    CancelGesture,
    PlaceText { at: Point, text: String },
    PlaceSticky { at: Point, text: String },
    Patch { id: ElementId, patch: ElementPatch },
    Translate { id: ElementId, dx: f64, dy: f64 },
    Delete { id: ElementId },
    Clear,
    /// Replace the collection with a JSON snapshot
    Load { json: String },
    Undo,
    Redo,
    /// Broadcast the whole collection so peers can recover
    SendFull,
}

/// Result of executing a command
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Unchanged,
    /// Only the gesture preview changed
    DraftChanged,
    /// The collection changed. `kind` is the delta describing it.
    Committed {
        kind: DeltaKind,
        id: Option<ElementId>,
    },
}

impl Outcome {
    /// Whether the collection changed
    pub fn is_committed(&self) -> bool {
        matches!(self, Outcome::Committed { .. })
    }

    fn wholesale() -> Self {
        Outcome::Committed {
            kind: DeltaKind::Full,
            id: None,
        }
    }
}

pub struct Whiteboard<C> {
    collection: Collection,
    history: History,
    engine: SyncEngine<C>,
    style: Style,
    draft: Option<Draft>,
    coalescer: MoveCoalescer,
    broadcast_history: bool,
}

impl<C: Channel> Whiteboard<C> {
    /// Create an empty whiteboard for `session` on `channel`
    pub fn new(session: Session, channel: C, config: &SyncConfig) -> Self {
        let engine = SyncEngine::new(session, channel)
            .with_full_sync_on_reconnect(config.full_sync_on_reconnect);
        Self {
            collection: Collection::new(),
            history: History::new(config.history_depth),
            engine,
            style: Style::default(),
            draft: None,
            coalescer: MoveCoalescer::new(config.move_interval),
            broadcast_history: config.broadcast_history,
        }
    }

    /// Get the live collection
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Get the local undo history
    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn engine(&self) -> &SyncEngine<C> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SyncEngine<C> {
        &mut self.engine
    }

    pub fn client_id(&self) -> &ClientId {
        self.engine.client_id()
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Style for elements created from now on
    pub fn set_style(&mut self, style: Style) {
        self.style = style;
    }

    /// The gesture preview, if a gesture is running
    pub fn draft(&self) -> Option<&Element> {
        self.draft.as_ref().map(Draft::element)
    }

    /// Everything to paint, bottom to top: the collection, then the draft
    pub fn render_list(&self) -> impl Iterator<Item = &Element> {
        self.collection.iter().chain(self.draft())
    }

    /// Execute a command now
    pub fn execute(&mut self, command: Command) -> Result<Outcome, WhiteboardError> {
        self.execute_at(command, Instant::now())
    }

    /// Execute with an explicit clock, for pointer-move coalescing
    pub fn execute_at(&mut self, command: Command, now: Instant) -> Result<Outcome, WhiteboardError> {
        let outcome = match command {
            Command::PointerDown { tool, at } => self.begin_gesture(tool, at),
            Command::PointerMove { at } => self.move_pointer(at, now),
            Command::PointerUp => self.end_gesture(),
            Command::CancelGesture => self.cancel_gesture(),
            Command::PlaceText { at, text } => {
                let element = Element::text(at, text, &self.style);
                self.commit_add(element)
            }
            Command::PlaceSticky { at, text } => {
                let element = Element::sticky(at, text, &self.style);
                self.commit_add(element)
            }
            Command::Patch { id, patch } => self.patch(&id, &patch),
            Command::Translate { id, dx, dy } => self.translate(&id, dx, dy),
            Command::Delete { id } => self.delete(&id),
            Command::Clear => self.clear(),
            Command::Load { json } => {
                let loaded = Collection::from_json(&json)?;
                self.replace_with(loaded)
            }
            Command::Undo => self.undo(),
            Command::Redo => self.redo(),
            Command::SendFull => {
                self.engine.publish_full(&self.collection);
                Outcome::Unchanged
            }
        };
        Ok(outcome)
    }

    /// Release a coalesced pointer move whose window has passed
    pub fn tick(&mut self, now: Instant) -> Outcome {
        let Some(draft) = self.draft.as_mut() else {
            return Outcome::Unchanged;
        };
        match self.coalescer.tick(now) {
            Some(point) => {
                draft.update(point);
                Outcome::DraftChanged
            }
            None => Outcome::Unchanged,
        }
    }

    /// Apply whatever the channel has delivered
    pub fn poll_remote(&mut self) -> PollSummary {
        self.engine.poll(&mut self.collection)
    }

    /// Export the collection as pretty-printed JSON
    pub fn export_json(&self) -> Result<String, WhiteboardError> {
        Ok(self.collection.to_json_pretty()?)
    }

    /// Save the collection to a snapshot file
    pub fn save(&self, path: &Path) -> Result<(), WhiteboardError> {
        self.collection.save(path)?;
        info!(path = %path.display(), elements = self.collection.len(), "saved snapshot");
        Ok(())
    }

    /// Load a snapshot file. On error the current state is kept.
    pub fn load_file(&mut self, path: &Path) -> Result<Outcome, WhiteboardError> {
        let loaded = Collection::load(path)?;
        info!(path = %path.display(), elements = loaded.len(), "loaded snapshot");
        Ok(self.replace_with(loaded))
    }

    /// Close the channel
    pub fn close(&mut self) {
        self.engine.close();
    }

    // --- Gestures ---

    fn begin_gesture(&mut self, tool: Tool, at: Point) -> Outcome {
        if let Some(previous) = &self.draft {
            debug!(tool = previous.tool().name(), "pointer down during a gesture, discarding previous draft");
        }
        debug!(tool = tool.name(), x = at.x, y = at.y, "gesture started");
        self.coalescer.reset();
        self.draft = Some(Draft::begin(tool, at, &self.style));
        Outcome::DraftChanged
    }

    fn move_pointer(&mut self, at: Point, now: Instant) -> Outcome {
        let Some(draft) = self.draft.as_mut() else {
            return Outcome::Unchanged;
        };
        match self.coalescer.offer(at, now) {
            Some(point) => {
                draft.update(point);
                Outcome::DraftChanged
            }
            None => Outcome::Unchanged,
        }
    }

    fn end_gesture(&mut self) -> Outcome {
        let Some(mut draft) = self.draft.take() else {
            return Outcome::Unchanged;
        };
        if let Some(point) = self.coalescer.flush() {
            draft.update(point);
        }
        self.coalescer.reset();
        self.commit_add(draft.commit())
    }

    fn cancel_gesture(&mut self) -> Outcome {
        self.coalescer.reset();
        match self.draft.take() {
            Some(_) => Outcome::DraftChanged,
            None => Outcome::Unchanged,
        }
    }

    // --- Committed mutations ---

    fn commit_add(&mut self, element: Element) -> Outcome {
        self.history.record_snapshot(&self.collection);
        let id = element.id.clone();
        debug!(%id, kind = element.kind(), "adding element");
        self.collection.append(element.clone());
        self.engine.publish(Delta::Add { element });
        Outcome::Committed {
            kind: DeltaKind::Add,
            id: Some(id),
        }
    }

    fn commit_update(&mut self, element: Element) -> Outcome {
        let id = element.id.clone();
        self.engine.publish(Delta::Update { element });
        Outcome::Committed {
            kind: DeltaKind::Update,
            id: Some(id),
        }
    }

    fn patch(&mut self, id: &ElementId, patch: &ElementPatch) -> Outcome {
        if patch.is_empty() {
            return Outcome::Unchanged;
        }
        self.commit_change(id, |element| element.apply_patch(patch), |collection| {
            collection.patch(id, patch).cloned()
        })
    }

    fn translate(&mut self, id: &ElementId, dx: f64, dy: f64) -> Outcome {
        self.commit_change(id, |element| element.translate(dx, dy), |collection| {
            collection.translate(id, dx, dy).cloned()
        })
    }

    /// Record and publish an in-place change only if `preview` shows it
    /// alters the element. `apply` performs it on the live collection.
    fn commit_change(
        &mut self,
        id: &ElementId,
        preview: impl FnOnce(&mut Element),
        apply: impl FnOnce(&mut Collection) -> Option<Element>,
    ) -> Outcome {
        let Some(current) = self.collection.get(id) else {
            return Outcome::Unchanged;
        };
        let mut changed = current.clone();
        preview(&mut changed);
        if &changed == current {
            debug!(%id, "change leaves element as is, ignored");
            return Outcome::Unchanged;
        }
        self.history.record_snapshot(&self.collection);
        match apply(&mut self.collection) {
            Some(element) => self.commit_update(element),
            None => Outcome::Unchanged,
        }
    }

    fn delete(&mut self, id: &ElementId) -> Outcome {
        if !self.collection.contains(id) {
            debug!(%id, "delete of unknown element ignored");
            return Outcome::Unchanged;
        }
        self.history.record_snapshot(&self.collection);
        self.collection.remove(id);
        self.engine.publish(Delta::Delete { id: id.clone() });
        Outcome::Committed {
            kind: DeltaKind::Delete,
            id: Some(id.clone()),
        }
    }

    fn clear(&mut self) -> Outcome {
        if self.collection.is_empty() {
            return Outcome::Unchanged;
        }
        self.history.record_snapshot(&self.collection);
        self.collection.clear();
        self.broadcast_wholesale();
        Outcome::wholesale()
    }

    fn replace_with(&mut self, loaded: Collection) -> Outcome {
        self.history.record_snapshot(&self.collection);
        self.collection = loaded;
        self.broadcast_wholesale();
        Outcome::wholesale()
    }

    fn undo(&mut self) -> Outcome {
        let cancelled = self.cancel_gesture();
        if !self.history.undo(&mut self.collection) {
            return cancelled;
        }
        self.broadcast_wholesale();
        Outcome::wholesale()
    }

    fn redo(&mut self) -> Outcome {
        let cancelled = self.cancel_gesture();
        if !self.history.redo(&mut self.collection) {
            return cancelled;
        }
        self.broadcast_wholesale();
        Outcome::wholesale()
    }

    fn broadcast_wholesale(&mut self) {
        if self.broadcast_history {
            self.engine.publish_full(&self.collection);
        }
    }
}
