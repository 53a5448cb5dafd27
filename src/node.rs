//! Search tree node types.
//!
//! Nodes live in the arena owned by [`SearchTree`](crate::tree::SearchTree)
//! and refer to each other by index.

use crate::game::{GameState, Player};

/// Index of a node in the tree arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The root node is always at index 0.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Lifecycle of a node. A node only ever moves forward through these states,
/// terminal nodes go straight from `Unexpanded` to `Evaluated`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeStatus {
    Unexpanded,
    Expanded,
    Evaluated,
}

#[derive(Clone, Debug)]
pub struct SearchNode<G: GameState> {
    state: G,
    /// Move that produced `state` (None for the root)
    last_move: Option<G::Move>,
    pub(crate) score: Option<f64>,
    parent: Option<NodeId>,
    pub(crate) children: Option<Vec<NodeId>>,
    depth: usize,
    pub(crate) alpha: f64,
    pub(crate) beta: f64,
    player_to_move: Player,
    moves: Vec<G::Move>,
    pub(crate) status: NodeStatus,
}

impl<G: GameState> SearchNode<G> {
    /// Creates a node and caches the legal moves of the player to move.
    ///
    /// `root_player` moves at even depths and their opponent at odd depths.
    pub fn new(
        state: G,
        last_move: Option<G::Move>,
        parent: Option<NodeId>,
        depth: usize,
        root_player: Player,
    ) -> Self {
        let player_to_move = if depth % 2 == 0 {
            root_player
        } else {
            root_player.opponent()
        };
        let moves = state.generate_moves(player_to_move);
        Self {
            state,
            last_move,
            score: None,
            parent,
            children: None,
            depth,
            alpha: f64::NEG_INFINITY,
            beta: f64::INFINITY,
            player_to_move,
            moves,
            status: NodeStatus::Unexpanded,
        }
    }

    pub fn state(&self) -> &G {
        &self.state
    }

    pub fn last_move(&self) -> Option<&G::Move> {
        self.last_move.as_ref()
    }

    /// Minimax score, None until the node has been evaluated
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in move order, empty until the node is expanded
    pub fn children(&self) -> &[NodeId] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn has_children(&self) -> bool {
        !self.children().is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn player_to_move(&self) -> Player {
        self.player_to_move
    }

    pub fn legal_moves(&self) -> &[G::Move] {
        &self.moves
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    /// Even depths maximise, odd depths minimise
    pub fn is_maximizing(&self) -> bool {
        self.depth % 2 == 0
    }
}
