//! The boundary between the planner and a storage engine.
//!
//! The planner reads the current state through [`GraphView`] and realizes
//! commands through the primitives of [`GraphStore`]. It never touches
//! storage internals.

use crate::{
    ContextId, DelegateRef, Direction, GraphResult, GraphUid, ObjectKind, ObjectRef, RelationInfo,
    RelationType, RepType, SliceId, Uid, Value,
};

/// Read-only queries against the current state of a graph.
///
/// All queries see only live (non-terminated) objects.
pub trait GraphView {
    /// Uid of the graph being viewed.
    fn graph_uid(&self) -> GraphUid;

    /// The most recently committed slice.
    fn latest_slice(&self) -> SliceId;

    /// Returns true if a live object with this origin uid is on the graph.
    fn contains(&self, uid: Uid) -> bool;

    /// Describe a live object.
    fn object(&self, uid: Uid) -> Option<ObjectRef>;

    /// Current value of an attribute entity, `None` if unassigned.
    fn current_value(&self, uid: Uid) -> Option<Value>;

    /// The delegate node of a representation type, if instantiated.
    fn find_delegate(&self, delegate: &DelegateRef) -> Option<Uid>;

    /// The value node for a value, if instantiated.
    fn find_value_node(&self, value: &Value) -> Option<Uid>;

    /// Returns true if the tag is attached to this object.
    fn has_tag(&self, uid: Uid, tag: &str) -> bool;

    /// Live relations of a type attached to an object, in creation order.
    fn relations(&self, uid: Uid, rt: &RelationType, direction: Direction) -> Vec<RelationInfo>;
}

/// Handle to an open (possibly nested) transaction scope.
#[derive(Debug, PartialEq, Eq)]
pub struct TxHandle {
    graph: GraphUid,
    context: ContextId,
    depth: usize,
}

impl TxHandle {
    pub fn new(graph: GraphUid, context: ContextId, depth: usize) -> Self {
        Self {
            graph,
            context,
            depth,
        }
    }

    pub fn graph(&self) -> GraphUid {
        self.graph
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Nesting depth; 1 is the outermost scope.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_outermost(&self) -> bool {
        self.depth == 1
    }
}

/// How a transaction scope is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    Commit,
    Abort,
}

/// What closing a scope did to the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    /// An inner scope closed; the outermost scope decides.
    Nested,
    /// Changes were committed in a new slice marked by this object.
    Committed { marker: ObjectRef },
    /// The transaction changed nothing; no slice was created.
    Unchanged { slice: SliceId },
    /// All changes were rolled back.
    Aborted,
}

/// The primitive write operations of a storage engine.
///
/// Every write must happen between `open_transaction` and the outermost
/// `close_transaction`. Only one context may hold a graph's transaction at
/// a time; the holder may nest further scopes.
pub trait GraphStore: GraphView {
    /// Open a transaction scope for `context`.
    fn open_transaction(&mut self, context: ContextId) -> GraphResult<TxHandle>;

    /// Close the innermost scope. The outermost close commits or aborts.
    fn close_transaction(&mut self, handle: TxHandle, finish: Finish) -> GraphResult<TxOutcome>;

    /// The context holding the open transaction, if any.
    fn holder(&self) -> Option<ContextId>;

    /// Create a new entity or attribute entity.
    fn instantiate(&mut self, ty: &RepType) -> GraphResult<Uid>;

    /// Create a new relation between two live objects.
    fn instantiate_relation(&mut self, rt: &RelationType, source: Uid, target: Uid)
        -> GraphResult<Uid>;

    /// Bring an object with a known origin onto this graph, or find it here.
    fn merge_by_origin(&mut self, kind: &ObjectKind, uid: Uid) -> GraphResult<Uid>;

    /// Find or create the delegate node of a representation type.
    fn delegate(&mut self, delegate: &DelegateRef) -> GraphResult<Uid>;

    /// Find or create the value node for a value.
    fn value_node(&mut self, value: &Value) -> GraphResult<Uid>;

    fn assign_value(&mut self, uid: Uid, value: Value) -> GraphResult<()>;

    /// Terminate an object together with every relation attached to it.
    fn terminate(&mut self, uid: Uid) -> GraphResult<()>;

    /// Attach a tag; tag names are unique, so this moves an existing tag.
    fn attach_tag(&mut self, uid: Uid, tag: &str) -> GraphResult<()>;
}
