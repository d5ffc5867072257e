//! Property tests over randomly generated wish lists.

use std::collections::HashSet;

use graft_tests::prelude::*;
use proptest::prelude::*;

/// A small random world: entities, links between them, and optional ages.
#[derive(Debug, Clone)]
struct World {
    entities: usize,
    links: Vec<(usize, usize)>,
    ages: Vec<Option<i64>>,
}

impl World {
    fn wishes(&self) -> Vec<Wish> {
        let name = |i: usize| format!("e{}", i);
        let mut wishes: Vec<Wish> = (0..self.entities)
            .map(|i| Wish::entity("Node").named(name(i)))
            .collect();
        for &(source, target) in &self.links {
            wishes.push(Wish::triple(
                Wish::reference(name(source)),
                "Links",
                Wish::reference(name(target)),
            ));
        }
        for (i, age) in self.ages.iter().enumerate() {
            if let Some(age) = age {
                wishes.push(Wish::fields(Wish::reference(name(i)), [("Age", Wish::scalar(*age))]));
            }
        }
        wishes
    }
}

fn world() -> impl Strategy<Value = World> {
    (1usize..6).prop_flat_map(|entities| {
        (
            prop::collection::vec((0..entities, 0..entities), 0..8),
            prop::collection::vec(prop::option::of(0i64..100), entities),
        )
            .prop_map(move |(links, ages)| World {
                entities,
                links,
                ages,
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_producers_precede_consumers(world in world()) {
        let graph = graph();

        let plan = Planner::new(&graph).plan(&world.wishes()).unwrap();

        let mut produced = HashSet::new();
        for command in &plan.commands {
            for id in command.consumes() {
                prop_assert!(
                    produced.contains(&id),
                    "{} consumes {} before it is produced",
                    command.kind(),
                    id
                );
            }
            produced.extend(command.produces());
        }
    }

    #[test]
    fn prop_planning_is_deterministic(world in world()) {
        let graph = graph();
        let wishes = world.wishes();

        let first = Planner::new(&graph).plan(&wishes).unwrap();
        let second = Planner::new(&graph).plan(&wishes).unwrap();

        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_resubmission_changes_nothing(world in world()) {
        let mut graph = graph();
        let wishes = world.wishes();
        let config = TransactConfig::debug();

        let first = transact(&mut graph, &wishes, &config).unwrap();
        let live = graph.live_count();
        let second = transact_with(&mut graph, &wishes, first.to_bindings(), &config).unwrap();

        prop_assert_eq!(second.tx(), &TxMarker::NoTransaction);
        prop_assert_eq!(graph.live_count(), live);

        // every name resolves to the same object as before
        let named = |receipt: &Receipt| -> Vec<(Ident, ObjectRef)> {
            receipt
                .iter()
                .filter(|(id, _)| id.is_user())
                .map(|(id, object)| (id.clone(), object.clone()))
                .collect()
        };
        prop_assert_eq!(named(&first), named(&second));
        prop_assert_eq!(named(&first).len(), world.entities);
    }
}
