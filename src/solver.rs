//! An agent to pick moves with a game tree search

use log::{debug, log_enabled, trace, warn, Level};
use parking_lot::Mutex;
use rayon::prelude::*;

use std::time::Instant;

use crate::{
    config::SearchConfig,
    error::{Result, SearchError},
    game::{GameState, Player},
    node::{NodeId, NodeStatus},
    transposition_table::{SharedTranspositionSet, Transpositions},
    tree::SearchTree,
    MAX_SEARCH_DEPTH,
};

/// Outcome of one move decision
#[derive(Clone, Debug)]
pub struct SearchReport<M> {
    pub best_move: M,
    /// Minimax value of the root, None when the only legal move was returned without searching
    pub score: Option<f64>,
    pub nodes_evaluated: usize,
    /// Distinct states produced during the search
    pub transpositions: usize,
    pub cutoffs: usize,
    pub timed_out: bool,
}

/// An agent that picks moves by building a game tree to a fixed depth
///
/// # Notes
/// A fresh [`SearchTree`] is built for every decision. The tree is either grown
/// completely (minimax) or with alpha-beta pruning, and the move leading to
/// the best child of the root is played.
///
/// # Position Scoring
/// Every score in one search is the heuristic evaluation of a board from the
/// point of view of the player to move at the root. The root and all even
/// depths maximise, odd depths minimise.
#[derive(Clone)]
pub struct Solver {
    config: SearchConfig,

    /// The number of nodes evaluated by this `Solver` so far (for diagnostics only)
    pub node_count: usize,
    /// The number of times the remaining children of a node were skipped
    pub cutoff_count: usize,
    deadline: Option<Instant>,
    timed_out: bool,
}

impl Solver {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            node_count: 0,
            cutoff_count: 0,
            deadline: None,
            timed_out: false,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// A copy with the same configuration and deadline but empty counters
    fn fork(&self) -> Self {
        Self {
            node_count: 0,
            cutoff_count: 0,
            ..self.clone()
        }
    }

    /// Non-blocking deadline check, sticky once it has fired
    fn out_of_time(&mut self) -> bool {
        if self.timed_out {
            return true;
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                warn!("search deadline reached, scoring the remaining nodes with the heuristic");
                self.timed_out = true;
                true
            }
            _ => false,
        }
    }

    /// Nodes that still need expanding are scored directly once the deadline fires
    fn should_stop<G: GameState, T: Transpositions<G>>(
        &mut self,
        tree: &SearchTree<G, T>,
        id: NodeId,
    ) -> bool {
        tree.is_terminal(id)
            || (tree.get(id).status() == NodeStatus::Unexpanded && self.out_of_time())
    }

    fn evaluate<G: GameState, T: Transpositions<G>>(
        &mut self,
        tree: &mut SearchTree<G, T>,
        id: NodeId,
    ) -> Result<f64> {
        self.node_count += 1;
        tree.evaluate_node(id)
    }

    /// Grows the full minimax tree below `start` and returns its score.
    ///
    /// Nodes are visited depth first in child order. The traversal keeps an
    /// explicit stack so deep limits do not exhaust the call stack.
    pub fn build_tree<G: GameState, T: Transpositions<G>>(
        &mut self,
        tree: &mut SearchTree<G, T>,
        start: NodeId,
    ) -> Result<f64> {
        // (node, children already searched)
        let mut stack = vec![(start, false)];
        let mut score = None;

        while let Some((id, children_done)) = stack.pop() {
            if children_done || self.should_stop(tree, id) {
                score = Some(self.evaluate(tree, id)?);
                continue;
            }
            let children = tree.expand(id)?;
            stack.push((id, true));
            // reversed so the first child is popped first
            stack.extend(children.into_iter().rev().map(|child| (child, false)));
        }

        // the start node is always the last one evaluated
        score.ok_or(SearchError::EmptyChildren {
            depth: tree.get(start).depth(),
        })
    }

    /// Grows the tree below `id` with alpha-beta pruning and returns its score.
    ///
    /// Every child is searched with the current `[alpha, beta]` window of its
    /// parent. As soon as `alpha >= beta` the remaining children are left
    /// unsearched, since a perfect opponent would never let play reach them.
    /// The node's score is the max or min of the children actually scored.
    pub fn build_pruned_tree<G: GameState, T: Transpositions<G>>(
        &mut self,
        tree: &mut SearchTree<G, T>,
        id: NodeId,
        mut alpha: f64,
        mut beta: f64,
    ) -> Result<f64> {
        tree.set_window(id, alpha, beta);
        if self.should_stop(tree, id) {
            return self.evaluate(tree, id);
        }

        let children = tree.expand(id)?;
        let maximizing = tree.get(id).is_maximizing();

        for (i, &child) in children.iter().enumerate() {
            let score = if tree.is_terminal(child) {
                self.evaluate(tree, child)?
            } else {
                self.build_pruned_tree(tree, child, alpha, beta)?
            };

            if maximizing {
                alpha = alpha.max(score);
            } else {
                beta = beta.min(score);
            }
            tree.set_window(id, alpha, beta);

            if alpha >= beta {
                let skipped = children.len() - i - 1;
                if skipped > 0 {
                    trace!(
                        "cutoff at depth {} after {} children, skipping {}",
                        tree.get(id).depth(),
                        i + 1,
                        skipped
                    );
                    self.cutoff_count += 1;
                }
                break;
            }
        }

        self.evaluate(tree, id)
    }

    /// Expands the root once and searches each root child on the rayon pool,
    /// all subtrees sharing one transposition set.
    ///
    /// With pruning, a child starts from the best score among the lower
    /// indexed siblings that have already finished. This only saves work, the
    /// root still picks the same child as a sequential search would.
    fn build_tree_parallel<G: GameState>(
        &mut self,
        tree: &mut SearchTree<G, SharedTranspositionSet<G>>,
    ) -> Result<f64> {
        let children = tree.expand(NodeId::ROOT)?;
        let jobs: Vec<_> = children
            .iter()
            .map(|&child| {
                let node = tree.get(child);
                (node.state().clone(), node.last_move().cloned())
            })
            .collect();

        let finished = Mutex::new(vec![None; jobs.len()]);
        let (perspective, max_depth) = (tree.perspective(), tree.max_depth());
        let outcome_check_limit = self.config.outcome_check_limit;
        let use_pruning = self.config.use_pruning;
        let transpositions = tree.transpositions().clone();
        let template = self.fork();

        let results = jobs
            .into_par_iter()
            .enumerate()
            .map(|(i, (state, last_move))| -> Result<(f64, Solver)> {
                let mut solver = template.clone();
                let mut subtree = SearchTree::subtree(
                    state,
                    last_move,
                    1,
                    perspective,
                    max_depth,
                    transpositions.clone(),
                )
                .with_outcome_check_limit(outcome_check_limit);

                let score = if use_pruning {
                    let alpha = finished.lock()[..i]
                        .iter()
                        .flatten()
                        .fold(f64::NEG_INFINITY, |a: f64, &s: &f64| a.max(s));
                    solver.build_pruned_tree(&mut subtree, NodeId::ROOT, alpha, f64::INFINITY)?
                } else {
                    solver.build_tree(&mut subtree, NodeId::ROOT)?
                };
                finished.lock()[i] = Some(score);
                Ok((score, solver))
            })
            .collect::<Result<Vec<_>>>()?;

        for (&child, (score, solver)) in children.iter().zip(results) {
            tree.adopt_score(child, score);
            self.node_count += solver.node_count;
            self.cutoff_count += solver.cutoff_count;
            self.timed_out |= solver.timed_out;
        }
        self.evaluate(tree, NodeId::ROOT)
    }

    /// Runs the configured search from `state` with `player` to move
    pub fn solve<G: GameState>(&mut self, state: &G, player: Player) -> Result<SearchReport<G::Move>> {
        let depth_limit = self.config.depth_limit;
        if depth_limit == 0 || depth_limit > MAX_SEARCH_DEPTH {
            return Err(SearchError::InvalidDepth(depth_limit));
        }
        if state.outcome().is_decided() {
            return Err(SearchError::InvalidState(
                "the game is already decided".to_string(),
            ));
        }

        self.deadline = self.config.time_limit.map(|limit| Instant::now() + limit);
        self.timed_out = false;
        let (start_nodes, start_cutoffs) = (self.node_count, self.cutoff_count);

        let moves = state.generate_moves(player);
        if moves.len() == 1 {
            debug!("single legal move {:?}, skipping the search", moves[0]);
            return Ok(SearchReport {
                best_move: moves[0].clone(),
                score: None,
                nodes_evaluated: 0,
                transpositions: 0,
                cutoffs: 0,
                timed_out: false,
            });
        }
        if moves.is_empty() {
            return Err(SearchError::NoLegalMoves);
        }

        let (best_move, score, transpositions) = if self.config.parallel {
            let mut tree = SearchTree::with_transpositions(
                state.clone(),
                player,
                depth_limit,
                SharedTranspositionSet::new(),
            )
            .with_outcome_check_limit(self.config.outcome_check_limit);
            let score = self.build_tree_parallel(&mut tree)?;
            Self::trace_tree(&tree);
            (Self::read_best_move(&tree)?, score, tree.transpositions().len())
        } else {
            let mut tree = SearchTree::new(state.clone(), player, depth_limit)
                .with_outcome_check_limit(self.config.outcome_check_limit);
            // the root is always expanded, even if the deadline has already passed
            tree.expand(NodeId::ROOT)?;
            let score = if self.config.use_pruning {
                self.build_pruned_tree(&mut tree, NodeId::ROOT, f64::NEG_INFINITY, f64::INFINITY)?
            } else {
                self.build_tree(&mut tree, NodeId::ROOT)?
            };
            Self::trace_tree(&tree);
            (Self::read_best_move(&tree)?, score, tree.transpositions().len())
        };

        let report = SearchReport {
            best_move,
            score: Some(score),
            nodes_evaluated: self.node_count - start_nodes,
            transpositions,
            cutoffs: self.cutoff_count - start_cutoffs,
            timed_out: self.timed_out,
        };
        debug!(
            "depth {} search: best {:?} score {}, {} nodes, {} states, {} cutoffs{}",
            depth_limit,
            report.best_move,
            score,
            report.nodes_evaluated,
            report.transpositions,
            report.cutoffs,
            if report.timed_out { ", timed out" } else { "" }
        );
        Ok(report)
    }

    /// Returns the move leading to the best child of the root
    pub fn choose_move<G: GameState>(&mut self, state: &G, player: Player) -> Result<G::Move> {
        Ok(self.solve(state, player)?.best_move)
    }

    fn trace_tree<G: GameState, T: Transpositions<G>>(tree: &SearchTree<G, T>) {
        if log_enabled!(Level::Trace) {
            trace!("search tree:\n{}", tree.dump(NodeId::ROOT));
        }
    }

    fn read_best_move<G: GameState, T: Transpositions<G>>(tree: &SearchTree<G, T>) -> Result<G::Move> {
        tree.best_move().cloned().ok_or(SearchError::EmptyChildren { depth: 0 })
    }
}
