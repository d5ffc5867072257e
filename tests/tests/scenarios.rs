//! End-to-end scenarios: plan and execute wish lists against a graph.

use graft_mutation::{ConflictError, OrderingError};
use graft_transaction::Executor;
use graft_tests::prelude::*;

mod single_entity {
    use super::*;

    pub fn scenario() -> Scenario {
        Scenario::new("single_entity")
            .step("create_p1", vec![Wish::entity("Person").named("p1")], |a| {
                a.created(1).has("p1")
            })
            // p1 is bound from the previous receipt, so nothing is created
            .step("resubmit_p1", vec![Wish::entity("Person").named("p1")], |a| {
                a.created(0).unchanged().has("p1")
            })
    }

    #[test]
    fn test_create_then_resubmit() {
        let run = scenario().run().unwrap();

        let first = run.receipt("create_p1").unwrap().user("p1").unwrap().uid;
        let second = run.receipt("resubmit_p1").unwrap().user("p1").unwrap().uid;
        assert_eq!(first, second);
        assert_eq!(run.graph.live_count(), 1);
    }

    #[test]
    fn test_single_instantiate_command() {
        let graph = graph();

        let plan = Planner::new(&graph)
            .plan(&[Wish::entity("Person").named("p1")])
            .unwrap();

        assert_eq!(plan.commands.len(), 1);
        assert!(matches!(plan.commands[0], Command::Instantiate(_)));
    }
}

mod ownership_triple {
    use super::*;

    fn owns() -> Wish {
        Wish::Triple {
            source: Wish::entity("Person").named("a").into(),
            rt: RelationType::new("Owns"),
            name: Some(Ident::user("owns")),
            target: Wish::entity("Dog").named("b").into(),
        }
    }

    pub fn scenario() -> Scenario {
        Scenario::new("ownership_triple").step("link", vec![owns()], |a| {
            a.created(3).has("a").has("b").has("owns")
        })
    }

    #[test]
    fn test_relation_links_both_ends() {
        let run = scenario().run().unwrap();
        let receipt = run.receipt("link").unwrap();

        let relation = receipt.user("owns").unwrap();
        let a = receipt.user("a").unwrap().uid;
        let b = receipt.user("b").unwrap().uid;
        assert_eq!(relation.kind.endpoints(), Some((a, b)));
    }

    #[test]
    fn test_endpoints_ordered_before_relation() {
        let graph = graph();

        let plan = Planner::new(&graph).plan(&[owns()]).unwrap();

        let position = |name: &str| {
            plan.commands
                .iter()
                .position(|c| c.produces().contains(&Ident::user(name)))
                .unwrap()
        };
        assert!(position("a") < position("owns"));
        assert!(position("b") < position("owns"));
    }
}

mod conflicting_assigns {
    use super::*;

    #[test]
    fn test_two_values_for_one_target() {
        // GIVEN two assigns of different values to z
        let mut graph = graph();
        let wishes = vec![
            Wish::attribute(ValueType::Int).named("z"),
            Wish::assign(Wish::reference("z"), 5),
            Wish::assign(Wish::reference("z"), 6),
        ];

        // WHEN
        let result = transact(&mut graph, &wishes, &TransactConfig::new());

        // THEN nothing is applied
        assert!(matches!(
            result.unwrap_err(),
            TransactionError::Plan(PlanError::Conflict(ConflictError::AssignConflict { .. }))
        ));
        assert_eq!(graph.live_count(), 0);
        assert_eq!(graph.latest_slice(), SliceId::GENESIS);
    }

    #[test]
    fn test_instantiate_and_terminate_same_identity() {
        let mut graph = graph();
        let wishes = vec![
            Wish::entity("Person").named("p"),
            Wish::terminate(Wish::reference("p")),
        ];

        let result = transact(&mut graph, &wishes, &TransactConfig::new());

        assert!(matches!(
            result.unwrap_err(),
            TransactionError::Plan(PlanError::Conflict(ConflictError::InstantiateTerminate { .. }))
        ));
    }

    #[test]
    fn test_terminate_of_existing_conflicts_with_instantiate() {
        // GIVEN p already on the graph
        let run = Scenario::new("existing")
            .step("create", vec![Wish::entity("Person").named("p")], |a| a.has("p"))
            .run()
            .unwrap();
        let mut graph = run.graph;

        // WHEN the same list re-declares and terminates it
        let wishes = vec![
            Wish::entity("Person").named("p"),
            Wish::terminate(Wish::reference("p")),
        ];
        let result = transact_with(&mut graph, &wishes, run.bindings, &TransactConfig::new());

        // THEN the clash is still reported
        assert!(matches!(
            result.unwrap_err(),
            TransactionError::Plan(PlanError::Conflict(_))
        ));
    }
}

mod dependency_cycle {
    use super::*;

    fn link(name: &str, source: &str) -> Wish {
        Wish::Triple {
            source: Wish::reference(source).into(),
            rt: RelationType::new("Links"),
            name: Some(Ident::user(name)),
            target: Wish::reference("x").into(),
        }
    }

    #[test]
    fn test_self_referential_relations() {
        // GIVEN two relations each sourced at the other
        let mut graph = graph();
        let wishes = vec![
            Wish::entity("Node").named("x"),
            link("r1", "r2"),
            link("r2", "r1"),
        ];

        // WHEN
        let result = transact(&mut graph, &wishes, &TransactConfig::new());

        // THEN both relations are reported as stuck
        match result.unwrap_err() {
            TransactionError::Plan(PlanError::Ordering(OrderingError::Cycle { stuck })) => {
                assert_eq!(stuck.len(), 2);
                let unmet: Vec<_> = stuck.iter().flat_map(|s| s.unmet.clone()).collect();
                assert!(unmet.contains(&Ident::user("r1")));
                assert!(unmet.contains(&Ident::user("r2")));
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
        assert_eq!(graph.live_count(), 0);
    }
}

mod stale_and_unsettled {
    use super::*;

    #[test]
    fn test_plan_outlived_by_another_commit() {
        // GIVEN a plan computed on the empty graph
        let mut graph = graph();
        let plan = Planner::new(&graph)
            .plan(&[Wish::entity("Person").named("p")])
            .unwrap();

        // AND another transaction commits in the meantime
        transact(&mut graph, &[Wish::entity("Dog").named("d")], &TransactConfig::new()).unwrap();
        let slice = graph.latest_slice();

        // WHEN the old plan is executed
        let result = Executor::new(&mut graph).execute(&plan, ContextId::current());

        // THEN it is refused and the graph is as the other commit left it
        match result.unwrap_err() {
            TransactionError::StaleSnapshot { planned, current } => {
                assert_eq!(planned, SliceId::GENESIS);
                assert_eq!(current, slice);
            }
            other => panic!("expected a stale snapshot, got {other:?}"),
        }
        assert_eq!(graph.live_count(), 1);
        assert_eq!(graph.latest_slice(), slice);
        assert_eq!(graph.holder(), None);
    }

    #[test]
    fn test_round_limit_reached() {
        // GIVEN p on the graph, and a planner allowed a single round
        let run = Scenario::new("existing")
            .step("create", vec![Wish::entity("Person").named("p")], |a| a.has("p"))
            .run()
            .unwrap();
        let mut graph = run.graph;
        let slice = graph.latest_slice();
        let config = TransactConfig::new().with_plan(PlanConfig::new().with_max_rounds(1));

        // WHEN the first round culls the declaration and needs another
        let wishes = vec![Wish::entity("Person").named("p"), Wish::entity("Dog").named("d")];
        let result = transact_with(&mut graph, &wishes, run.bindings, &config);

        // THEN planning gives up and nothing is applied
        assert!(matches!(
            result.unwrap_err(),
            TransactionError::Plan(PlanError::Conflict(ConflictError::Unsettled { rounds: 1 }))
        ));
        assert_eq!(graph.live_count(), 1);
        assert_eq!(graph.latest_slice(), slice);
    }
}

mod fields_and_tags {
    use super::*;

    pub fn scenario() -> Scenario {
        Scenario::new("fields_and_tags")
            .step(
                "create_alice",
                vec![
                    Wish::fields(
                        Wish::entity("Person").named("alice"),
                        [("Name", Wish::scalar("Alice").named("name"))],
                    ),
                    Wish::tag(Wish::reference("alice"), "me"),
                ],
                |a| a.created(3).has("alice").value("name", "Alice").tagged("me", "alice"),
            )
            .step(
                "rename",
                vec![Wish::set_field(
                    Wish::reference("alice"),
                    "Name",
                    Wish::scalar("Alicia"),
                )],
                |a| a.created(0).terminated(0).value("name", "Alicia"),
            )
            .step(
                "rename_again_to_same",
                vec![Wish::set_field(
                    Wish::reference("alice"),
                    "Name",
                    Wish::scalar("Alicia"),
                )],
                |a| a.unchanged(),
            )
    }

    #[test]
    fn test_set_field_reassigns_in_place() {
        scenario().run().unwrap();
    }

    #[test]
    fn test_terminate_removes_relations() {
        let run = Scenario::new("terminate")
            .step(
                "create",
                vec![Wish::triple(
                    Wish::entity("Person").named("p"),
                    "Owns",
                    Wish::entity("Dog").named("d"),
                )],
                |a| a.created(3),
            )
            .step("terminate_dog", vec![Wish::terminate(Wish::reference("d"))], |a| {
                a.terminated(2).lacks("d")
            })
            .run()
            .unwrap();

        assert_eq!(run.graph.live_count(), 1);
    }
}

mod replay {
    use super::*;

    #[test]
    fn test_replayed_plan_matches_original() {
        // GIVEN the JSON of a plan computed on an empty graph
        let source = graph();
        let wishes = vec![Wish::triple(
            Wish::entity("Person").named("a"),
            "Owns",
            Wish::entity("Dog").named("b"),
        )];
        let json = Planner::new(&source).plan(&wishes).unwrap().to_json().unwrap();

        // WHEN it is replayed as raw commands
        let run = Scenario::new("replay")
            .replay("replayed", json, |a| a.created(3).has("a").has("b"))
            .run()
            .unwrap();

        // THEN
        assert_eq!(run.graph.live_count(), 3);
    }

    #[test]
    fn test_malformed_json_is_reported() {
        let result = Scenario::new("replay")
            .replay("broken", "[{", |a| a)
            .run();

        assert!(matches!(
            result.unwrap_err(),
            graft_tests::ScenarioError::Replay { .. }
        ));
    }
}
