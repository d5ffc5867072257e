//! The planning pipeline.
//!
//! Resolves and compiles a wish list, then alternates culling and
//! recombination until neither changes anything, and finally orders what
//! is left. Planning only reads the graph.

use crate::alias::AliasMap;
use crate::compiler::Compiler;
use crate::cull::Culler;
use crate::error::{ConflictError, PlanResult};
use crate::{order, recombine_all, resolve, Bindings, Command, Ident, PlanConfig, Wish};
use graft_core::{GraphUid, GraphView, SliceId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument, trace};

/// An ordered, conflict-free command list ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Commands in execution order.
    pub commands: Vec<Command>,
    /// Every identifier that was merged into another, with its representative.
    pub aliases: BTreeMap<Ident, Ident>,
    /// Every identifier the wish list mentions.
    pub idents: BTreeSet<Ident>,
    /// Graph the plan was computed against.
    pub graph: GraphUid,
    /// Latest slice of that graph when planning.
    pub slice: SliceId,
}

impl Plan {
    /// The representative an identifier resolves to.
    pub fn canonical(&self, id: &Ident) -> Ident {
        self.aliases.get(id).cloned().unwrap_or_else(|| id.clone())
    }

    /// A plan with nothing to execute.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The command list as JSON, in the format accepted by raw command wishes.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.commands)
    }
}

/// Plans wish lists against a graph snapshot.
pub struct Planner<'a> {
    view: &'a dyn GraphView,
    config: PlanConfig,
    bindings: Bindings,
}

impl<'a> Planner<'a> {
    pub fn new(view: &'a dyn GraphView) -> Self {
        Self {
            view,
            config: PlanConfig::default(),
            bindings: Bindings::new(),
        }
    }

    pub fn with_config(mut self, config: PlanConfig) -> Self {
        self.config = config;
        self
    }

    /// Identifiers that already name objects, e.g. a previous receipt.
    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// Plan a wish list.
    #[instrument(skip_all, fields(wishes = wishes.len(), graph = %self.view.graph_uid()))]
    pub fn plan(&self, wishes: &[Wish]) -> PlanResult<Plan> {
        let definitions = resolve(wishes, &self.bindings)?;
        let compiled =
            Compiler::new(&self.config, self.view, &self.bindings, &definitions).compile(wishes)?;

        let mut idents: BTreeSet<Ident> = definitions.idents().cloned().collect();
        idents.extend(compiled.iter().flat_map(Command::idents));

        // Recombine once before culling: culling would otherwise hide
        // conflicts between commands on identifiers that already exist.
        let mut aliases = AliasMap::new();
        let (commands, _) = recombine_all(compiled)?;
        let (mut commands, _) = absorb(&mut aliases, commands)?;

        let culler = Culler::new(self.view, &self.bindings);
        let mut rounds = 0;
        loop {
            if rounds == self.config.max_rounds {
                return Err(ConflictError::Unsettled { rounds }.into());
            }
            rounds += 1;

            let culled = culler.cull(commands, true)?;
            let mut changed = culled.dropped > 0;
            for (id, uid) in &culled.aliases {
                changed |= aliases.bind(id, *uid)?;
            }
            let relabelled = culled.commands.into_iter().map(|c| aliases.relabel(c)).collect();
            let (merged, merges) = recombine_all(relabelled)?;
            let (next, absorbed) = absorb(&mut aliases, merged)?;
            commands = next;
            changed |= merges > 0 || absorbed;

            trace!(round = rounds, dropped = culled.dropped, merges, commands = commands.len(), "round");
            if !changed {
                break;
            }
        }
        debug!(rounds, commands = commands.len(), aliases = aliases.len(), "settled");

        let culled = culler.cull(commands, false)?;
        for (id, uid) in &culled.aliases {
            aliases.bind(id, *uid)?;
        }
        let commands: Vec<Command> = culled.commands.into_iter().map(|c| aliases.relabel(c)).collect();
        let commands = order(commands, |id| culler.lookup(id).is_some())?;
        debug!(commands = commands.len(), "planned");

        Ok(Plan {
            commands,
            aliases: aliases.resolved(),
            idents,
            graph: self.view.graph_uid(),
            slice: self.view.latest_slice(),
        })
    }
}

/// Fold alias commands into the alias map and relabel the rest.
fn absorb(aliases: &mut AliasMap, commands: Vec<Command>) -> PlanResult<(Vec<Command>, bool)> {
    let mut changed = false;
    let mut rest = Vec::with_capacity(commands.len());
    for command in commands {
        match command {
            Command::Alias(alias) => changed |= aliases.union_all(&alias.ids)?,
            other => rest.push(other),
        }
    }
    let rest = rest.into_iter().map(|c| aliases.relabel(c)).collect();
    Ok((rest, changed))
}
