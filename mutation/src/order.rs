//! Dependency ordering.
//!
//! Commands are sorted topologically so that each one runs after the
//! commands producing the identifiers it consumes. Commands are first
//! stably sorted by rank (objects, then relations, values, tags,
//! terminations); the ready queue is seeded in that order and every command
//! released later joins the back of the queue in discovery order. A command
//! whose dependencies are met can therefore run ahead of a lower-ranked one
//! that was seeded later. The order is deterministic for a given input.

use crate::error::{OrderingError, PlanResult, StuckCommand};
use crate::{Atom, Command, Ident, Origin};
use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::{debug, trace};

fn rank(command: &Command) -> u32 {
    match command {
        Command::Instantiate(c) => match c.atom {
            Atom::Relation { .. } => 1,
            Atom::Entity(_) | Atom::Attribute(_) | Atom::Delegate(_) | Atom::ValueNode(_) => 0,
        },
        Command::Merge(c) => match &c.origin {
            Origin::Object(object) if object.kind.is_relation() => 1,
            Origin::Object(_) | Origin::Delegate(_) | Origin::Value(_) => 0,
        },
        Command::Assign(_) => 10,
        Command::Tag(_) => 20,
        Command::Terminate(_) => 30,
        Command::SetField(_)
        | Command::Alias(_)
        | Command::BeSource(_)
        | Command::BeTarget(_)
        | Command::MustLive(_) => 999,
    }
}

/// Order commands so that every command follows its dependencies.
///
/// `resolvable` tells whether an identifier that no command produces already
/// denotes an object on the graph. Commands waiting on anything else are
/// reported as stuck.
pub fn order(commands: Vec<Command>, resolvable: impl Fn(&Ident) -> bool) -> PlanResult<Vec<Command>> {
    let total = commands.len();
    let mut commands = skip_recreated_terminates(commands);
    let skipped = total - commands.len();
    commands.sort_by_key(rank);

    let n = commands.len();
    let mut producer: HashMap<Ident, usize> = HashMap::new();
    for (i, command) in commands.iter().enumerate() {
        for id in command.produces() {
            producer.entry(id).or_insert(i);
        }
    }

    let mut deps: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    let mut unmet: Vec<Vec<Ident>> = vec![Vec::new(); n];
    for (i, command) in commands.iter().enumerate() {
        let own = command.produces();
        for id in command.consumes() {
            if own.contains(&id) {
                continue;
            }
            match producer.get(&id) {
                Some(&p) => {
                    deps[i].insert(p);
                }
                None if resolvable(&id) => {}
                None => unmet[i].push(id),
            }
        }
        // A termination runs after everything else touching its target.
        if let Command::Terminate(t) = command {
            for (j, other) in commands.iter().enumerate() {
                if j != i && !matches!(other, Command::Terminate(_)) && other.idents().contains(&t.target) {
                    deps[i].insert(j);
                }
            }
        }
    }

    let mut indegree: Vec<usize> = deps.iter().map(BTreeSet::len).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, ds) in deps.iter().enumerate() {
        for &p in ds {
            dependents[p].push(i);
        }
    }

    let mut ready: VecDeque<usize> = (0..n)
        .filter(|&i| indegree[i] == 0 && unmet[i].is_empty())
        .collect();
    let mut emitted = vec![false; n];
    let mut sequence = Vec::with_capacity(n);
    while let Some(i) = ready.pop_front() {
        emitted[i] = true;
        sequence.push(i);
        for &d in &dependents[i] {
            indegree[d] -= 1;
            if indegree[d] == 0 && unmet[d].is_empty() {
                ready.push_back(d);
            }
        }
    }

    if sequence.len() < n {
        let stuck = (0..n)
            .filter(|&i| !emitted[i])
            .map(|i| stuck_command(&commands, i, &producer, &emitted, &unmet[i]))
            .collect();
        return Err(OrderingError::Cycle { stuck }.into());
    }

    debug!(ordered = n, skipped, "ordered commands");
    let mut slots: Vec<Option<Command>> = commands.into_iter().map(Some).collect();
    Ok(sequence.into_iter().filter_map(|i| slots[i].take()).collect())
}

/// Drop terminations of identities that a later command recreates.
fn skip_recreated_terminates(commands: Vec<Command>) -> Vec<Command> {
    let mut kept = Vec::with_capacity(commands.len());
    for (i, command) in commands.iter().enumerate() {
        if let Command::Terminate(t) = command {
            let recreated = commands[i + 1..].iter().any(|later| {
                !matches!(later, Command::Terminate(_)) && later.produces().contains(&t.target)
            });
            if recreated {
                trace!(target = %t.target, "terminate skipped, target is recreated");
                continue;
            }
        }
        kept.push(command.clone());
    }
    kept
}

fn stuck_command(
    commands: &[Command],
    i: usize,
    producer: &HashMap<Ident, usize>,
    emitted: &[bool],
    unmet: &[Ident],
) -> StuckCommand {
    let command = &commands[i];
    let mut waiting: Vec<Ident> = unmet.to_vec();
    for id in command.consumes() {
        if let Some(&p) = producer.get(&id) {
            if p != i && !emitted[p] && !waiting.contains(&id) {
                waiting.push(id);
            }
        }
    }
    if let Command::Terminate(t) = command {
        if !waiting.contains(&t.target) {
            waiting.push(t.target.clone());
        }
    }
    StuckCommand {
        command: command.clone(),
        unmet: waiting,
    }
}
