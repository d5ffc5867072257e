//! Core graph storage implementation.

use crate::holder::{HolderState, Leave};
use crate::index::{AdjacencyIndex, StructuralIndex, TagIndex};
use crate::undo::{UndoEntry, UndoLog};
use graft_core::{
    ContextId, DelegateRef, Direction, Finish, GraphError, GraphResult, GraphStore, GraphUid,
    GraphView, ObjectKind, ObjectRef, RelationInfo, RelationType, RepType, SliceId, TxHandle,
    TxOutcome, Uid, Value,
};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, trace};

/// Index allocator for objects created on this graph.
#[derive(Debug)]
struct IdAllocator {
    graph: GraphUid,
    next_index: u64,
}

impl IdAllocator {
    fn new(graph: GraphUid) -> Self {
        Self {
            graph,
            next_index: 1,
        }
    }

    fn alloc(&mut self) -> Uid {
        let uid = Uid::new(self.graph, self.next_index);
        self.next_index += 1;
        uid
    }
}

/// An object as stored, with its lifetime in slices.
#[derive(Debug, Clone)]
struct StoredObject {
    kind: ObjectKind,
    value: Option<Value>,
    born: SliceId,
    died: Option<SliceId>,
}

impl StoredObject {
    fn is_alive(&self) -> bool {
        self.died.is_none()
    }
}

/// The versioned in-memory graph storage.
#[derive(Debug)]
pub struct Graph {
    uid: GraphUid,
    /// Object storage, live and terminated
    objects: HashMap<Uid, StoredObject>,
    /// Index allocator
    id_alloc: IdAllocator,
    /// Latest committed slice
    latest: SliceId,
    /// Adjacency index
    adj_index: AdjacencyIndex,
    /// Delegate and value node index
    structural: StructuralIndex,
    /// Tag index
    tags: TagIndex,
    /// Who holds the open transaction
    holder: HolderState,
    /// Changes of the open transaction
    undo: UndoLog,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Create a new empty graph with a fresh random uid.
    pub fn new() -> Self {
        Self::with_uid(GraphUid::random())
    }

    /// Create a new empty graph with a fixed uid.
    pub fn with_uid(uid: GraphUid) -> Self {
        Self {
            uid,
            objects: HashMap::new(),
            id_alloc: IdAllocator::new(uid),
            latest: SliceId::GENESIS,
            adj_index: AdjacencyIndex::new(),
            structural: StructuralIndex::new(),
            tags: TagIndex::new(),
            holder: HolderState::Inactive,
            undo: UndoLog::new(),
        }
    }

    pub fn uid(&self) -> GraphUid {
        self.uid
    }

    /// Transaction holder state.
    pub fn holder_state(&self) -> HolderState {
        self.holder
    }

    /// The object a tag currently names.
    pub fn tagged(&self, tag: &str) -> Option<ObjectRef> {
        self.tags.get(tag).and_then(|uid| self.object(uid))
    }

    /// Number of live objects, transaction markers excluded.
    pub fn live_count(&self) -> usize {
        self.objects
            .values()
            .filter(|o| o.is_alive() && o.kind != ObjectKind::TxMarker)
            .count()
    }

    /// Number of objects ever stored, including terminated ones.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// The slice an object was created in, even if it has since died.
    pub fn born_in(&self, uid: Uid) -> Option<SliceId> {
        self.objects.get(&uid).map(|o| o.born)
    }

    /// The slice an object was terminated in.
    pub fn terminated_in(&self, uid: Uid) -> Option<SliceId> {
        self.objects.get(&uid).and_then(|o| o.died)
    }

    // ==================== Internal Helpers ====================

    /// The slice the open transaction writes into.
    fn pending_slice(&self) -> SliceId {
        self.latest.next()
    }

    /// The slice reads are reported in.
    fn view_slice(&self) -> SliceId {
        if self.holder.is_active() {
            self.pending_slice()
        } else {
            self.latest
        }
    }

    fn ensure_active(&self) -> GraphResult<()> {
        if !self.holder.is_active() {
            return Err(GraphError::NoActiveTransaction(self.uid));
        }
        Ok(())
    }

    fn live(&self, uid: Uid) -> GraphResult<&StoredObject> {
        let object = self
            .objects
            .get(&uid)
            .ok_or(GraphError::ObjectNotFound(uid))?;
        if !object.is_alive() {
            return Err(GraphError::Terminated(uid));
        }
        Ok(object)
    }

    /// Insert a new live object and index it.
    fn insert(&mut self, uid: Uid, kind: ObjectKind) {
        match &kind {
            ObjectKind::Relation { source, target, .. } => {
                self.adj_index.insert(uid, *source, *target);
            }
            ObjectKind::Delegate(d) => self.structural.insert_delegate(d.clone(), uid),
            ObjectKind::ValueNode(v) => self.structural.insert_value(v.clone(), uid),
            _ => {}
        }
        trace!(%uid, kind = %kind, "object created");
        self.objects.insert(
            uid,
            StoredObject {
                kind,
                value: None,
                born: self.pending_slice(),
                died: None,
            },
        );
        self.undo.track_created(uid);
    }

    /// Remove an object entirely (undo of a creation).
    fn remove(&mut self, uid: Uid) {
        if let Some(object) = self.objects.remove(&uid) {
            match &object.kind {
                ObjectKind::Relation { source, target, .. } => {
                    self.adj_index.remove(uid, *source, *target);
                }
                ObjectKind::Delegate(d) => self.structural.remove_delegate(d),
                ObjectKind::ValueNode(v) => self.structural.remove_value(v),
                _ => {}
            }
        }
    }

    fn rollback(&mut self) {
        let entries: Vec<UndoEntry> = self.undo.drain_newest_first().collect();
        debug!(graph = %self.uid, changes = entries.len(), "rolling back transaction");
        for entry in entries {
            match entry {
                UndoEntry::Created(uid) => self.remove(uid),
                UndoEntry::Terminated(uid) => {
                    if let Some(object) = self.objects.get_mut(&uid) {
                        object.died = None;
                    }
                }
                UndoEntry::Assigned { uid, previous } => {
                    if let Some(object) = self.objects.get_mut(&uid) {
                        object.value = previous;
                    }
                }
                UndoEntry::Tagged { tag, previous } => self.tags.restore(&tag, previous),
            }
        }
    }

    fn commit(&mut self) -> TxOutcome {
        if self.undo.is_empty() {
            debug!(graph = %self.uid, slice = %self.latest, "transaction changed nothing");
            return TxOutcome::Unchanged { slice: self.latest };
        }
        let slice = self.pending_slice();
        let marker = self.id_alloc.alloc();
        self.insert(marker, ObjectKind::TxMarker);
        self.undo.clear();
        self.latest = slice;
        debug!(graph = %self.uid, %slice, %marker, "transaction committed");
        TxOutcome::Committed {
            marker: ObjectRef::new(marker, ObjectKind::TxMarker, slice),
        }
    }

    fn check_same_shape(&self, uid: Uid, stored: &ObjectKind, merging: &ObjectKind) -> GraphResult<()> {
        if stored != merging {
            return Err(GraphError::origin_conflict(
                uid,
                stored.to_string(),
                merging.to_string(),
            ));
        }
        Ok(())
    }
}

// ==================== Read Operations ====================

impl GraphView for Graph {
    fn graph_uid(&self) -> GraphUid {
        self.uid
    }

    fn latest_slice(&self) -> SliceId {
        self.latest
    }

    fn contains(&self, uid: Uid) -> bool {
        self.objects.get(&uid).is_some_and(StoredObject::is_alive)
    }

    fn object(&self, uid: Uid) -> Option<ObjectRef> {
        self.objects
            .get(&uid)
            .filter(|o| o.is_alive())
            .map(|o| ObjectRef::new(uid, o.kind.clone(), self.view_slice()))
    }

    fn current_value(&self, uid: Uid) -> Option<Value> {
        self.objects
            .get(&uid)
            .filter(|o| o.is_alive())
            .and_then(|o| o.value.clone())
    }

    fn find_delegate(&self, delegate: &DelegateRef) -> Option<Uid> {
        self.structural.delegate(delegate).filter(|uid| self.contains(*uid))
    }

    fn find_value_node(&self, value: &Value) -> Option<Uid> {
        self.structural.value(value).filter(|uid| self.contains(*uid))
    }

    fn has_tag(&self, uid: Uid, tag: &str) -> bool {
        self.tags.get(tag) == Some(uid) && self.contains(uid)
    }

    fn relations(&self, uid: Uid, rt: &RelationType, direction: Direction) -> Vec<RelationInfo> {
        let candidates: Vec<Uid> = match direction {
            Direction::Outgoing => self.adj_index.outgoing(uid).collect(),
            Direction::Incoming => self.adj_index.incoming(uid).collect(),
        };
        candidates
            .into_iter()
            .filter_map(|rel| {
                let object = self.objects.get(&rel).filter(|o| o.is_alive())?;
                match &object.kind {
                    ObjectKind::Relation {
                        rt: kind_rt,
                        source,
                        target,
                    } if kind_rt == rt => Some(RelationInfo {
                        uid: rel,
                        rt: kind_rt.clone(),
                        source: *source,
                        target: *target,
                    }),
                    _ => None,
                }
            })
            .collect()
    }
}

// ==================== Write Operations ====================

impl GraphStore for Graph {
    fn open_transaction(&mut self, context: ContextId) -> GraphResult<TxHandle> {
        let depth = self.holder.enter(self.uid, context)?;
        if depth == 1 {
            self.undo.clear();
        }
        debug!(graph = %self.uid, %context, depth, "transaction scope opened");
        Ok(TxHandle::new(self.uid, context, depth))
    }

    fn close_transaction(&mut self, handle: TxHandle, finish: Finish) -> GraphResult<TxOutcome> {
        let leave = self.holder.leave(self.uid, &handle, finish)?;
        debug!(graph = %self.uid, depth = handle.depth(), ?finish, "transaction scope closed");
        Ok(match leave {
            Leave::Nested => TxOutcome::Nested,
            Leave::Outermost { commit: true } => self.commit(),
            Leave::Outermost { commit: false } => {
                self.rollback();
                TxOutcome::Aborted
            }
        })
    }

    fn holder(&self) -> Option<ContextId> {
        self.holder.holder()
    }

    fn instantiate(&mut self, ty: &RepType) -> GraphResult<Uid> {
        self.ensure_active()?;
        let kind = match ty {
            RepType::Entity(t) => ObjectKind::Entity(t.clone()),
            RepType::Attribute(t) => ObjectKind::Attribute(t.clone()),
            RepType::Relation(rt) => {
                return Err(GraphError::invalid_operation(format!(
                    "{} needs a source and a target",
                    rt
                )))
            }
        };
        let uid = self.id_alloc.alloc();
        self.insert(uid, kind);
        Ok(uid)
    }

    fn instantiate_relation(
        &mut self,
        rt: &RelationType,
        source: Uid,
        target: Uid,
    ) -> GraphResult<Uid> {
        self.ensure_active()?;
        self.live(source)?;
        self.live(target)?;
        let uid = self.id_alloc.alloc();
        self.insert(
            uid,
            ObjectKind::Relation {
                rt: rt.clone(),
                source,
                target,
            },
        );
        Ok(uid)
    }

    fn merge_by_origin(&mut self, kind: &ObjectKind, uid: Uid) -> GraphResult<Uid> {
        self.ensure_active()?;
        match kind {
            ObjectKind::Delegate(d) => return self.delegate(d),
            ObjectKind::ValueNode(v) => return self.value_node(v),
            ObjectKind::TxMarker => {
                return Err(GraphError::invalid_operation(
                    "transaction markers cannot be merged",
                ))
            }
            _ => {}
        }
        if let Some(stored) = self.objects.get(&uid) {
            if !stored.is_alive() {
                return Err(GraphError::Terminated(uid));
            }
            self.check_same_shape(uid, &stored.kind, kind)?;
            return Ok(uid);
        }
        if uid.is_native_to(self.uid) {
            // A native uid this graph never allocated cannot be merged in.
            return Err(GraphError::ObjectNotFound(uid));
        }
        if let Some((source, target)) = kind.endpoints() {
            self.live(source)?;
            self.live(target)?;
        }
        self.insert(uid, kind.clone());
        Ok(uid)
    }

    fn delegate(&mut self, delegate: &DelegateRef) -> GraphResult<Uid> {
        self.ensure_active()?;
        if let Some(uid) = self.find_delegate(delegate) {
            return Ok(uid);
        }
        let uid = self.id_alloc.alloc();
        self.insert(uid, ObjectKind::Delegate(delegate.clone()));
        Ok(uid)
    }

    fn value_node(&mut self, value: &Value) -> GraphResult<Uid> {
        self.ensure_active()?;
        if let Some(uid) = self.find_value_node(value) {
            return Ok(uid);
        }
        let uid = self.id_alloc.alloc();
        self.insert(uid, ObjectKind::ValueNode(value.clone()));
        Ok(uid)
    }

    fn assign_value(&mut self, uid: Uid, value: Value) -> GraphResult<()> {
        self.ensure_active()?;
        let stored = match &self.live(uid)?.kind {
            ObjectKind::Attribute(vt) => vt
                .coerce(&value)
                .ok_or_else(|| GraphError::type_mismatch(vt.to_string(), value.type_name()))?,
            _ => return Err(GraphError::NotAssignable(uid)),
        };
        let object = self
            .objects
            .get_mut(&uid)
            .ok_or(GraphError::ObjectNotFound(uid))?;
        if object.value.as_ref() == Some(&stored) {
            return Ok(());
        }
        let previous = object.value.replace(stored);
        self.undo.track_assigned(uid, previous);
        Ok(())
    }

    fn terminate(&mut self, uid: Uid) -> GraphResult<()> {
        self.ensure_active()?;
        let pending = self.pending_slice();
        let object = self
            .objects
            .get(&uid)
            .ok_or(GraphError::ObjectNotFound(uid))?;
        match object.died {
            // Already taken down earlier in this transaction, e.g. by a cascade.
            Some(slice) if slice == pending => return Ok(()),
            Some(_) => return Err(GraphError::Terminated(uid)),
            None => {}
        }

        let mut queue = VecDeque::from([uid]);
        while let Some(current) = queue.pop_front() {
            let Some(object) = self.objects.get_mut(&current) else {
                continue;
            };
            if !object.is_alive() {
                continue;
            }
            object.died = Some(pending);
            self.undo.track_terminated(current);
            trace!(uid = %current, "object terminated");
            queue.extend(self.adj_index.involving(current));
        }
        Ok(())
    }

    fn attach_tag(&mut self, uid: Uid, tag: &str) -> GraphResult<()> {
        self.ensure_active()?;
        self.live(uid)?;
        let previous = self.tags.attach(tag, uid);
        if previous != Some(uid) {
            self.undo.track_tagged(tag, previous);
        }
        Ok(())
    }
}
