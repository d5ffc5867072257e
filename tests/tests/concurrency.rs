//! One transaction holder per graph, and nested scopes.

use std::sync::mpsc;
use std::sync::Mutex;
use std::thread;

use graft_core::{Finish, GraphError, TxOutcome};
use graft_tests::prelude::*;
use graft_transaction::{Executor, TransactionScope};

// ========== TEST: second_context_is_refused ==========
#[test]
fn test_second_context_is_refused() {
    // GIVEN context A holds the graph's transaction
    init_tracing();
    let mut graph = graph();
    let a = ContextId::fresh();
    let b = ContextId::fresh();
    let handle = graph.open_transaction(a).unwrap();

    // WHEN context B tries to transact
    let wishes = vec![Wish::entity("Person").named("p")];
    let config = TransactConfig::new().with_context(b);
    let result = transact(&mut graph, &wishes, &config);

    // THEN B is refused and A's transaction is untouched
    match result.unwrap_err() {
        TransactionError::Scope(GraphError::ConcurrentTransaction { holder, requester, .. }) => {
            assert_eq!(holder, a);
            assert_eq!(requester, b);
        }
        other => panic!("expected a concurrent transaction error, got {other:?}"),
    }
    assert_eq!(graph.holder(), Some(a));

    graph.close_transaction(handle, Finish::Commit).unwrap();
    assert_eq!(graph.holder(), None);
}

// ========== TEST: holder_on_another_thread ==========
#[test]
fn test_holder_on_another_thread() {
    // GIVEN a graph shared between two threads
    init_tracing();
    let graph = Mutex::new(graph());
    let (opened_tx, opened_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    thread::scope(|s| {
        let shared = &graph;
        // the holder opens a transaction, then waits before closing it
        s.spawn(move || {
            let handle = shared
                .lock()
                .unwrap()
                .open_transaction(ContextId::current())
                .unwrap();
            opened_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            let outcome = shared
                .lock()
                .unwrap()
                .close_transaction(handle, Finish::Commit)
                .unwrap();
            assert_eq!(outcome, TxOutcome::Unchanged { slice: SliceId::GENESIS });
        });

        opened_rx.recv().unwrap();

        // WHEN this thread transacts while the other holds the graph
        let wishes = vec![Wish::entity("Person").named("p")];
        let result = transact(&mut *graph.lock().unwrap(), &wishes, &TransactConfig::new());

        // THEN it is refused without waiting
        assert!(matches!(
            result.unwrap_err(),
            TransactionError::Scope(GraphError::ConcurrentTransaction { .. })
        ));
        release_tx.send(()).unwrap();
    });

    // once released, the same wishes go through
    let mut graph = graph.into_inner().unwrap();
    let wishes = vec![Wish::entity("Person").named("p")];
    let receipt = transact(&mut graph, &wishes, &TransactConfig::new()).unwrap();
    assert!(matches!(receipt.tx(), TxMarker::Committed(_)));
}

// ========== TEST: nested_execution_defers_to_outer_scope ==========
#[test]
fn test_nested_execution_defers_to_outer_scope() {
    // GIVEN an outer scope held by this context
    init_tracing();
    let mut graph = graph();
    let ctx = ContextId::fresh();
    let mut scope = TransactionScope::open(&mut graph, ctx).unwrap();

    // WHEN a plan executes inside it
    let plan = Planner::new(scope.graph())
        .plan(&[Wish::entity("Person").named("p")])
        .unwrap();
    let receipt = Executor::new(scope.graph_mut()).execute(&plan, ctx).unwrap();

    // THEN the receipt is marked nested and the outer scope commits
    assert_eq!(receipt.tx(), &TxMarker::Nested);
    let p = receipt.user("p").unwrap().uid;
    assert!(matches!(scope.commit().unwrap(), TxOutcome::Committed { .. }));
    assert!(graph.contains(p));
}

// ========== TEST: outer_abort_discards_nested_work ==========
#[test]
fn test_outer_abort_discards_nested_work() {
    let mut graph = graph();
    let ctx = ContextId::fresh();

    {
        let mut scope = TransactionScope::open(&mut graph, ctx).unwrap();
        let plan = Planner::new(scope.graph())
            .plan(&[Wish::triple(
                Wish::entity("Person").named("p"),
                "Owns",
                Wish::entity("Dog"),
            )])
            .unwrap();
        Executor::new(scope.graph_mut()).execute(&plan, ctx).unwrap();
        // dropped without commit
    }

    assert_eq!(graph.live_count(), 0);
    assert_eq!(graph.holder(), None);
    assert_eq!(graph.latest_slice(), SliceId::GENESIS);
}
