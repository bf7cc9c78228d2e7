//! Core MCTS search algorithm.
//!
//! Each simulation clones the caller's state, walks the tree choosing by
//! selection policy until it meets an unexplored choice, adds exactly one
//! node there, plays out, and backs the reward up the walked path. Search
//! stops when the budget runs out or the root is proven.
//!
//! The arena and the transposition cache persist across decisions, so the
//! work done for one decision can seed a later one that reaches an
//! equivalent position.

use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};
use smallvec::SmallVec;

use crate::core::{ChoiceDescriptor, ChoiceMode, GameRng, PlayerId, Visibility};
use crate::rules::StateAdapter;

use super::backup::{backpropagate, retract_solved, BackupPolicy, RobustMax};
use super::cache::TranspositionCache;
use super::config::MCTSConfig;
use super::error::SearchError;
use super::node::{MCTSNode, NodeDetails, NodeId, SolveState};
use super::policy::{
    best_decision, select_child, shaped_reward, RandomPlayout, SelectionPolicy, SimulationPolicy,
    UCB1,
};
use super::stats::SearchStats;
use super::tree::MCTSTree;

/// Inline capacity of the per-simulation path stack.
///
/// Sized to the deepest trees observed in practice; longer paths spill to
/// the heap rather than fail.
pub const PATH_CAPACITY: usize = 64;

type Path = SmallVec<[NodeId; PATH_CAPACITY]>;

/// Depth of a path of `len` nodes (root = 0), saturating at `u16::MAX`.
fn path_depth(len: usize) -> u16 {
    u16::try_from(len.saturating_sub(1)).unwrap_or(u16::MAX)
}

/// Per-child summary of the root, for diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct ChildReport {
    /// Position of the choice in the root enumeration.
    pub choice_index: u32,
    pub visits: u32,
    /// Value estimate from the agent's side.
    pub value: f64,
    pub solve: SolveState,
    pub steps: u32,
    /// This child is the current decision.
    pub selected: bool,
}

impl std::fmt::Display for ChildReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let marker = if self.selected { '*' } else { ' ' };
        let status = match self.solve {
            SolveState::ProvenWin => format!("win:{}", self.steps),
            SolveState::ProvenLoss => format!("lose:{}", self.steps),
            SolveState::Unknown => "?".to_string(),
        };
        write!(
            f,
            "{} [{}/{}/{}] #{}",
            marker,
            (self.value * 100.0) as i32,
            self.visits,
            status,
            self.choice_index
        )
    }
}

/// Main MCTS search context.
///
/// Generic over the state adapter. Owns the node arena, the transposition
/// cache and the configuration, and answers one decision at a time.
pub struct MCTSSearch<A: StateAdapter> {
    /// The game adapter.
    adapter: A,

    /// Search configuration.
    config: MCTSConfig,

    /// Node arena, shared by all decisions of a match.
    tree: MCTSTree,

    /// Fingerprint to node.
    cache: TranspositionCache,

    /// RNG for state sampling and playouts.
    rng: GameRng,

    /// Selection policy.
    selection: Box<dyn SelectionPolicy>,

    /// Backup policy.
    backup: Box<dyn BackupPolicy>,

    /// Simulation policy.
    simulation: Box<dyn SimulationPolicy<A>>,

    /// Root of the current (or last) decision.
    root: NodeId,

    /// Legal choices at the root, in enumeration order.
    root_choices: Vec<A::Choice>,

    /// Descriptors of `root_choices`.
    root_descriptors: Vec<ChoiceDescriptor>,

    /// Search statistics.
    stats: SearchStats,
}

impl<A: StateAdapter> MCTSSearch<A> {
    /// Create a new MCTS search context.
    pub fn new(adapter: A, config: MCTSConfig) -> Self {
        Self {
            adapter,
            rng: GameRng::new(config.seed),
            tree: MCTSTree::new(),
            cache: TranspositionCache::new(config.cache_capacity),
            selection: Box::new(UCB1),
            backup: Box::new(RobustMax::new(config.robust_min_visits)),
            simulation: Box::new(RandomPlayout),
            root: NodeId::NONE,
            root_choices: Vec::new(),
            root_descriptors: Vec::new(),
            stats: SearchStats::default(),
            config,
        }
    }

    /// Set a custom selection policy.
    pub fn with_selection<S: SelectionPolicy + 'static>(mut self, selection: S) -> Self {
        self.selection = Box::new(selection);
        self
    }

    /// Set a custom backup policy.
    pub fn with_backup<B: BackupPolicy + 'static>(mut self, backup: B) -> Self {
        self.backup = Box::new(backup);
        self
    }

    /// Set a custom simulation policy.
    pub fn with_simulation<S: SimulationPolicy<A> + 'static>(mut self, simulation: S) -> Self {
        self.simulation = Box::new(simulation);
        self
    }

    /// Choose the next action for `agent` with a budget of
    /// `level * config.ms_per_level` milliseconds.
    pub fn decide(&mut self, state: &A::State, agent: PlayerId, level: u32) -> Result<A::Choice, SearchError> {
        let budget = self.config.budget_for_level(level);
        self.search(state, agent, budget)
    }

    /// Choose the next action for `agent` within `budget`.
    ///
    /// The caller's state is never modified. The budget is checked between
    /// simulations, so one long simulation can overrun it.
    pub fn search(&mut self, state: &A::State, agent: PlayerId, budget: Duration) -> Result<A::Choice, SearchError> {
        let start = Instant::now();
        self.stats.reset();
        self.root = NodeId::NONE;

        if !self.adapter.has_pending_decision(state) {
            return Err(SearchError::NoPendingDecision);
        }

        let choices = self.adapter.legal_choices(state, ChoiceMode::Exact);
        match choices.as_slice() {
            [] => {
                return Err(SearchError::NoLegalChoices {
                    action_count: self.adapter.action_count(state),
                })
            }
            [only] => return Ok(only.clone()),
            _ => {}
        }
        self.root_descriptors = choices.iter().map(|c| self.adapter.describe(c)).collect();
        self.root_choices = choices;

        self.maybe_compact();
        let root = self.find_root(state, agent);
        self.root = root;
        self.stats.reused_simulations = self.tree.get(root).stats.visits;

        while !self.tree.get(root).is_solved() {
            if self.tree.len() >= self.config.max_nodes {
                debug!("arena full at {} nodes, stopping search", self.tree.len());
                break;
            }

            self.simulate_once(state, agent, root)?;
            self.stats.simulations += 1;

            if start.elapsed() >= budget {
                break;
            }
            if self.config.max_simulations > 0 && self.stats.simulations >= self.config.max_simulations {
                break;
            }
        }

        let elapsed = start.elapsed();
        self.stats.time_us = elapsed.as_micros() as u64;
        if let Some(overrun) = elapsed.checked_sub(budget) {
            self.stats.overrun_us = overrun.as_micros() as u64;
            if overrun.as_millis() as u64 > self.config.overrun_warn_ms {
                warn!(
                    "search overran its {}ms budget by {}ms",
                    budget.as_millis(),
                    overrun.as_millis()
                );
            }
        }

        let index = best_decision(&self.tree, root, &self.config)
            .map_or(0, |id| self.tree.get(id).choice_index as usize);

        debug!(
            "decided choice {} of {} after {}+{} simulations in {}us (root {:?})",
            index,
            self.root_choices.len(),
            self.stats.reused_simulations,
            self.stats.simulations,
            self.stats.time_us,
            self.tree.get(root).solve
        );
        if self.config.diagnostics {
            self.log_report(agent);
        }

        self.root_choices
            .get(index)
            .cloned()
            .ok_or(SearchError::NoLegalChoices {
                action_count: self.adapter.action_count(state),
            })
    }

    /// Compact the arena once it reaches `max_nodes`.
    ///
    /// Only subtrees reachable from the cache survive. If those alone fill
    /// half the arena, everything is dropped.
    fn maybe_compact(&mut self) {
        if self.tree.len() < self.config.max_nodes {
            return;
        }
        let before = self.tree.len();
        let roots: Vec<NodeId> = self.cache.nodes().collect();
        let remap = self.tree.compact(&roots);
        self.cache.remap(&remap);
        self.stats.compactions += 1;

        if self.tree.len() * 2 >= self.config.max_nodes {
            self.cache.clear();
            self.tree.clear();
        }
        debug!("compacted arena from {} to {} nodes", before, self.tree.len());
    }

    /// Reuse a cached node for this position or start a fresh root.
    fn find_root(&mut self, state: &A::State, agent: PlayerId) -> NodeId {
        let fingerprint = self.adapter.fingerprint(state);
        let is_maximizer = self.adapter.next_decision_owner(state) == agent;

        if let Some(id) = self.cache.get(fingerprint) {
            let node = self.tree.get(id);
            let owner_matches = !node.has_details() || node.is_maximizer() == is_maximizer;
            if owner_matches && self.tree.is_consistent(id, &self.root_descriptors) {
                self.stats.cache_hits += 1;
                debug!(
                    "cache hit {:016x}: reusing {} simulations",
                    fingerprint, node.stats.visits
                );
                if !node.has_details() {
                    self.tree.get_mut(id).details = Some(NodeDetails {
                        is_maximizer,
                        choices: self.root_descriptors.clone(),
                    });
                }
                return id;
            }

            warn!(
                "cached node for {:016x} no longer matches the live choices, discarding",
                fingerprint
            );
            self.stats.stale_nodes += 1;
            self.cache.remove(fingerprint);
            self.tree.get_mut(id).cached = false;
        }

        self.stats.cache_misses += 1;
        debug!("cache miss {:016x}", fingerprint);
        let id = self.tree.alloc(MCTSNode::root());
        self.tree.get_mut(id).details = Some(NodeDetails {
            is_maximizer,
            choices: self.root_descriptors.clone(),
        });
        id
    }

    /// One select / expand / simulate / backpropagate round.
    fn simulate_once(&mut self, state: &A::State, agent: PlayerId, root: NodeId) -> Result<(), SearchError> {
        let visibility = if self.config.cheat {
            Visibility::Revealed
        } else {
            Visibility::Sampled(agent)
        };
        let mut game = self.adapter.clone_state(state, visibility, &mut self.rng);

        let path = self.grow_tree(root, &mut game, agent)?;
        let depth = path_depth(path.len());
        self.stats.max_depth = self.stats.max_depth.max(depth);

        let leaf = path[path.len() - 1];
        let (reward, newly_solved) = self.playout(leaf, &mut game, agent)?;
        backpropagate(&mut self.tree, &path, reward, newly_solved, self.backup.as_ref());
        Ok(())
    }

    /// Walk down from the root and add one node.
    ///
    /// Returns the path from the root to the new node, or to the node where
    /// the game ended or hit the action ceiling.
    fn grow_tree(&mut self, root: NodeId, game: &mut A::State, agent: PlayerId) -> Result<Path, SearchError> {
        let mut path: Path = SmallVec::new();
        path.push(root);
        let mut registered = false;
        let mut curr = root;

        loop {
            // The root's choices are already known; below it, enumerate live.
            let live: Option<Vec<A::Choice>> = if curr == root {
                None
            } else {
                let Some(choices) = self.next_choices(game)? else {
                    break;
                };
                self.observe(curr, &path, game, agent, &choices);

                if !registered && self.tree.get(curr).is_maximizer() {
                    registered = true;
                    self.register(curr, game);
                }
                Some(choices)
            };
            let live_len = live.as_ref().map_or(self.root_choices.len(), Vec::len);

            let node = self.tree.get(curr);
            if node.has_unexplored(live_len) {
                let explored = node.children.len();
                let choice = match &live {
                    Some(choices) => &choices[explored],
                    None => &self.root_choices[explored],
                };
                let descriptor = self.adapter.describe(choice);
                self.adapter.apply(game, choice);

                let child = self.tree.add_child(curr, descriptor);
                self.stats.nodes_expanded += 1;
                trace!("expanded {} as choice {} of {}", child, explored, curr);
                path.push(child);
                return Ok(path);
            }

            let Some(next) = select_child(&self.tree, curr, self.selection.as_ref(), &self.config) else {
                break;
            };
            let index = self.tree.get(next).choice_index as usize;
            match &live {
                Some(choices) => self.adapter.apply(game, &choices[index]),
                None => self.adapter.apply(game, &self.root_choices[index]),
            }
            path.push(next);
            curr = next;
        }

        Ok(path)
    }

    /// Record or check the decision point details of an inner node.
    fn observe(&mut self, id: NodeId, path: &Path, game: &A::State, agent: PlayerId, choices: &[A::Choice]) {
        let descriptors: Vec<ChoiceDescriptor> = choices.iter().map(|c| self.adapter.describe(c)).collect();
        let is_maximizer = self.adapter.next_decision_owner(game) == agent;

        let node = self.tree.get(id);
        let owner_changed = node.has_details() && node.is_maximizer() != is_maximizer;
        if owner_changed || !self.tree.is_consistent(id, &descriptors) {
            self.discard_stale(id, path);
        }

        if !self.tree.get(id).has_details() {
            self.tree.get_mut(id).details = Some(NodeDetails {
                is_maximizer,
                choices: descriptors,
            });
        }
    }

    /// Drop the subtree of a node whose live choices disagree with what was
    /// recorded, undoing any proof built on it.
    fn discard_stale(&mut self, id: NodeId, path: &Path) {
        let was_solved = self.tree.get(id).is_solved();
        let node = self.tree.get_mut(id);
        node.solve = SolveState::Unknown;
        node.steps = 0;
        self.tree.discard_subtree(id);
        if was_solved {
            retract_solved(&mut self.tree, path);
        }
        self.stats.stale_nodes += 1;
        debug!("discarded stale subtree at {}", id);
    }

    /// Put an agent decision node into the transposition cache.
    fn register(&mut self, id: NodeId, game: &A::State) {
        if self.tree.get(id).cached {
            return;
        }
        let fingerprint = self.adapter.fingerprint(game);
        if let Some(previous) = self.cache.peek(fingerprint) {
            if previous != id {
                self.tree.get_mut(previous).cached = false;
            }
        }

        self.tree.get_mut(id).cached = true;
        self.stats.cache_inserts += 1;
        if let Some((_, evicted)) = self.cache.put(fingerprint, id) {
            self.tree.get_mut(evicted).cached = false;
        }
    }

    /// Advance to the next real decision.
    ///
    /// Forced steps and single-choice decisions are executed on the way.
    /// Returns `None` when the game ends or the action ceiling is reached.
    fn next_choices(&self, game: &mut A::State) -> Result<Option<Vec<A::Choice>>, SearchError> {
        let start = self.adapter.action_count(game);

        while !self.adapter.is_terminal(game)
            && self.adapter.action_count(game) - start < self.config.max_actions
        {
            if !self.adapter.has_pending_decision(game) {
                self.adapter.step(game);
                continue;
            }

            let choices = self.adapter.legal_choices(game, ChoiceMode::Exact);
            match choices.len() {
                0 => {
                    return Err(SearchError::NoLegalChoices {
                        action_count: self.adapter.action_count(game),
                    })
                }
                1 => self.adapter.apply(game, &choices[0]),
                _ => return Ok(Some(choices)),
            }
        }

        Ok(None)
    }

    /// Score the leaf's state. Returns the reward and whether the leaf
    /// became solved just now.
    fn playout(&mut self, leaf: NodeId, game: &mut A::State, agent: PlayerId) -> Result<(f64, bool), SearchError> {
        if self.adapter.is_terminal(game) {
            let node = self.tree.get_mut(leaf);
            let was_solved = node.is_solved();
            return Ok(match self.adapter.winner(game) {
                Some(winner) if winner == agent => {
                    if !was_solved {
                        node.set_win(0);
                    }
                    (1.0, !was_solved)
                }
                Some(_) => {
                    if !was_solved {
                        node.set_loss(0);
                    }
                    (0.0, !was_solved)
                }
                None => (0.5, false),
            });
        }

        let mut rng = self.rng.fork();
        let playout = self
            .simulation
            .simulate(&self.adapter, game, &mut rng, self.config.max_actions)?;
        Ok((shaped_reward(&playout, agent, self.config.max_actions), false))
    }

    /// Summary of every root child of the last decision.
    #[must_use]
    pub fn root_report(&self) -> Vec<ChildReport> {
        if self.root.is_none() {
            return Vec::new();
        }
        let selected = best_decision(&self.tree, self.root, &self.config);
        self.tree
            .get(self.root)
            .children
            .iter()
            .map(|&id| {
                let node = self.tree.get(id);
                ChildReport {
                    choice_index: node.choice_index,
                    visits: node.stats.visits,
                    value: node.stats.value(true),
                    solve: node.solve,
                    steps: node.steps,
                    selected: Some(id) == selected,
                }
            })
            .collect()
    }

    fn log_report(&self, agent: PlayerId) {
        info!(
            "MCTS {}: time {}ms, sims {}+{}",
            agent,
            self.stats.time_us / 1000,
            self.stats.reused_simulations,
            self.stats.simulations
        );
        for report in self.root_report() {
            match self.root_choices.get(report.choice_index as usize) {
                Some(choice) => info!("{} {:?}", report, choice),
                None => info!("{}", report),
            }
        }
    }

    /// Get root choice visit counts of the last decision.
    ///
    /// Returns (choice, visit_count) pairs for explored choices.
    pub fn action_visits(&self) -> Vec<(A::Choice, u32)> {
        self.root_report()
            .into_iter()
            .filter_map(|r| {
                self.root_choices
                    .get(r.choice_index as usize)
                    .map(|c| (c.clone(), r.visits))
            })
            .collect()
    }

    /// Root node of the last decision, if one was searched.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        (!self.root.is_none()).then_some(self.root)
    }

    /// Get search statistics.
    #[must_use]
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Get the node arena.
    #[must_use]
    pub fn tree(&self) -> &MCTSTree {
        &self.tree
    }

    /// Get the transposition cache.
    #[must_use]
    pub fn cache(&self) -> &TranspositionCache {
        &self.cache
    }

    /// Get the adapter reference.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Get the configuration.
    pub fn config(&self) -> &MCTSConfig {
        &self.config
    }
}
