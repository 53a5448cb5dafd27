//! Arena-allocated search tree.
//!
//! The tree owns every node in a flat `Vec`, nodes refer to their parent and
//! children by [`NodeId`]. One tree is built per move decision and dropped
//! once the move has been read off the root.

use std::fmt::Write;

use crate::error::{Result, SearchError};
use crate::game::{GameState, Player};
use crate::node::{NodeId, NodeStatus, SearchNode};
use crate::transposition_table::{TranspositionSet, Transpositions};

pub struct SearchTree<G: GameState, T = TranspositionSet<G>> {
    nodes: Vec<SearchNode<G>>,
    transpositions: T,
    max_depth: usize,
    perspective: Player,
    outcome_check_limit: Option<usize>,
    transpositions_skipped: usize,
}

impl<G: GameState> SearchTree<G> {
    /// Creates a tree rooted at `state` with `player` to move
    pub fn new(state: G, player: Player, max_depth: usize) -> Self {
        Self::with_transpositions(state, player, max_depth, TranspositionSet::new())
    }
}

impl<G: GameState, T: Transpositions<G>> SearchTree<G, T> {
    pub fn with_transpositions(state: G, player: Player, max_depth: usize, transpositions: T) -> Self {
        Self::subtree(state, None, 0, player, max_depth, transpositions)
    }

    /// Creates a tree whose root sits `depth` plies into a larger search that
    /// started with `root_player` to move. Depth parity, the depth limit and
    /// the score perspective all stay those of the larger search.
    pub(crate) fn subtree(
        state: G,
        last_move: Option<G::Move>,
        depth: usize,
        root_player: Player,
        max_depth: usize,
        transpositions: T,
    ) -> Self {
        let root = SearchNode::new(state, last_move, None, depth, root_player);
        Self {
            nodes: vec![root],
            transpositions,
            max_depth,
            perspective: root_player,
            outcome_check_limit: None,
            transpositions_skipped: 0,
        }
    }

    /// Sets the deepest depth at which a decisive outcome ends a branch early.
    /// `None` uses the board dimension.
    pub fn with_outcome_check_limit(mut self, limit: Option<usize>) -> Self {
        self.outcome_check_limit = limit;
        self
    }

    /// # Panics
    /// Panics if the NodeId does not belong to this tree.
    pub fn get(&self, id: NodeId) -> &SearchNode<G> {
        &self.nodes[id.0]
    }

    pub fn root(&self) -> &SearchNode<G> {
        self.get(NodeId::ROOT)
    }

    /// Number of nodes in the tree, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Player every score in this tree is expressed for
    pub fn perspective(&self) -> Player {
        self.perspective
    }

    pub fn transpositions(&self) -> &T {
        &self.transpositions
    }

    /// States produced by expansion but dropped because the tree had already seen them
    pub fn transpositions_skipped(&self) -> usize {
        self.transpositions_skipped
    }

    fn add(&mut self, node: SearchNode<G>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// A node is terminal at the depth limit, or earlier if the board is
    /// decided and the node is still shallow enough for the outcome check
    pub fn is_terminal(&self, id: NodeId) -> bool {
        let node = self.get(id);
        if node.depth() >= self.max_depth {
            return true;
        }
        let limit = self
            .outcome_check_limit
            .unwrap_or_else(|| node.state().dimension());
        node.depth() <= limit && node.state().outcome().is_decided()
    }

    /// Creates one child for every legal move whose resulting state has not
    /// been seen anywhere in this tree, in move order.
    ///
    /// Expanding a node twice returns the existing children.
    pub fn expand(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        let node = self.get(id);
        if node.status() != NodeStatus::Unexpanded {
            return Ok(node.children().to_vec());
        }
        let depth = node.depth() + 1;
        let player = node.player_to_move();

        let mut children = Vec::new();
        if depth <= self.max_depth {
            for i in 0..self.nodes[id.0].legal_moves().len() {
                let node = &self.nodes[id.0];
                let mv = node.legal_moves()[i].clone();
                let next = node.state().apply_move(&mv, player)?;

                if !self.transpositions.insert_if_absent(&next) {
                    self.transpositions_skipped += 1;
                    continue;
                }
                let child = SearchNode::new(next, Some(mv), Some(id), depth, self.perspective);
                children.push(self.add(child));
            }
        }

        let node = &mut self.nodes[id.0];
        node.children = Some(children.clone());
        node.status = NodeStatus::Expanded;
        Ok(children)
    }

    /// Iterates over every node below `id` (inclusive) that currently has no
    /// children, depth first in child order
    pub fn find_leaves(&self, id: NodeId) -> Leaves<'_, G, T> {
        Leaves {
            tree: self,
            stack: vec![id],
        }
    }

    /// Scores a node and freezes it.
    ///
    /// Nodes without children take the heuristic score of their board from
    /// the tree's perspective, this covers terminal nodes as well as nodes
    /// whose expansion produced nothing new. Other nodes take the max (even
    /// depth) or min (odd depth) of their scored children.
    pub(crate) fn evaluate_node(&mut self, id: NodeId) -> Result<f64> {
        let node = self.get(id);
        if let (NodeStatus::Evaluated, Some(score)) = (node.status(), node.score()) {
            return Ok(score);
        }

        let score = if node.has_children() {
            let scores = node.children().iter().filter_map(|c| self.nodes[c.0].score);
            let reduced = if node.is_maximizing() {
                scores.fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))))
            } else {
                scores.fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.min(s))))
            };
            reduced.ok_or(SearchError::EmptyChildren {
                depth: node.depth(),
            })?
        } else {
            let score = node.state().evaluate(self.perspective);
            if score.is_nan() {
                return Err(SearchError::InvalidState(format!(
                    "evaluation returned NaN at depth {}",
                    node.depth()
                )));
            }
            score
        };

        let node = &mut self.nodes[id.0];
        node.score = Some(score);
        node.status = NodeStatus::Evaluated;
        Ok(score)
    }

    /// Stores a score computed for this node by a search of a detached subtree
    pub(crate) fn adopt_score(&mut self, id: NodeId, score: f64) {
        let node = &mut self.nodes[id.0];
        if node.status != NodeStatus::Evaluated {
            node.score = Some(score);
            node.status = NodeStatus::Evaluated;
        }
    }

    pub(crate) fn set_window(&mut self, id: NodeId, alpha: f64, beta: f64) {
        let node = &mut self.nodes[id.0];
        node.alpha = alpha;
        node.beta = beta;
    }

    /// Child with the greatest score, the first one wins ties
    pub fn max_child(&self, id: NodeId) -> Option<NodeId> {
        self.pick_child(id, |candidate, best| candidate > best)
    }

    /// Child with the least score, the first one wins ties
    pub fn min_child(&self, id: NodeId) -> Option<NodeId> {
        self.pick_child(id, |candidate, best| candidate < best)
    }

    fn pick_child(&self, id: NodeId, better: impl Fn(f64, f64) -> bool) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for &child in self.get(id).children() {
            let score = match self.get(child).score() {
                Some(score) => score,
                // pruned before it was searched
                None => continue,
            };
            match best {
                Some((_, best_score)) if !better(score, best_score) => {}
                _ => best = Some((child, score)),
            }
        }
        best.map(|(child, _)| child)
    }

    /// Move leading to the root's best child
    pub fn best_move(&self) -> Option<&G::Move> {
        self.max_child(NodeId::ROOT)
            .and_then(|child| self.get(child).last_move())
    }

    /// The other children of `id`'s parent, in move order. The root has none.
    pub fn siblings(&self, id: NodeId) -> Vec<NodeId> {
        match self.get(id).parent() {
            Some(parent) => self
                .get(parent)
                .children()
                .iter()
                .copied()
                .filter(|&sibling| sibling != id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Renders the subtree below `id`, one line per node indented by depth
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let node = self.get(id);
            let _ = writeln!(
                out,
                "{:indent$}{:?} depth {} score {:?} window [{}, {}]",
                "",
                node.last_move(),
                node.depth(),
                node.score(),
                node.alpha(),
                node.beta(),
                indent = node.depth()
            );
            stack.extend(node.children().iter().rev());
        }
        out
    }
}

/// Lazy depth-first walk over the childless nodes of a tree
pub struct Leaves<'a, G: GameState, T> {
    tree: &'a SearchTree<G, T>,
    stack: Vec<NodeId>,
}

impl<'a, G: GameState, T: Transpositions<G>> Iterator for Leaves<'a, G, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let node = self.tree.get(id);
            if !node.has_children() {
                return Some(id);
            }
            self.stack.extend(node.children().iter().rev());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hexboard::{HexBoard, HexMove};
    use anyhow::Result;

    fn tree(dimension: usize, max_depth: usize) -> Result<SearchTree<HexBoard>> {
        Ok(SearchTree::new(HexBoard::new(dimension)?, Player::One, max_depth))
    }

    #[test]
    fn expand_links_children() -> Result<()> {
        let mut tree = tree(2, 2)?;
        let children = tree.expand(NodeId::ROOT)?;

        assert_eq!(children.len(), 4);
        for &child in &children {
            assert_eq!(tree.get(child).depth(), 1);
            assert_eq!(tree.get(child).parent(), Some(NodeId::ROOT));
            assert_eq!(tree.get(child).player_to_move(), Player::Two);
            assert_eq!(tree.get(child).legal_moves().len(), 3);
        }
        assert_eq!(tree.root().status(), NodeStatus::Expanded);
        assert_eq!(tree.transpositions().len(), 4);

        // expanding again does not create new nodes
        assert_eq!(tree.expand(NodeId::ROOT)?, children);
        assert_eq!(tree.len(), 5);
        Ok(())
    }

    #[test]
    fn expand_skips_transpositions() -> Result<()> {
        let mut tree = tree(2, 3)?;
        let mut frontier = vec![NodeId::ROOT];
        for _ in 0..3 {
            let mut next = Vec::new();
            for id in frontier {
                next.extend(tree.expand(id)?);
            }
            frontier = next;
        }

        // 4 + 4*3 distinct states, then two player one stones and one player
        // two stone on four cells: 6 * 2 distinct out of 24 produced
        assert_eq!(frontier.len(), 12);
        assert_eq!(tree.transpositions_skipped(), 12);
        assert_eq!(tree.transpositions().len(), 28);
        assert_eq!(tree.len(), 29);
        Ok(())
    }

    #[test]
    fn nothing_grows_past_the_depth_limit() -> Result<()> {
        let mut tree = tree(2, 1)?;
        let children = tree.expand(NodeId::ROOT)?;
        assert!(tree.is_terminal(children[0]));
        assert!(tree.expand(children[0])?.is_empty());
        assert!(tree.nodes.iter().all(|n| n.depth() <= 1));
        Ok(())
    }

    #[test]
    fn decided_boards_are_terminal_within_the_horizon() -> Result<()> {
        // player one completes a1-a2 with the child created for a2
        let board = HexBoard::from_moves(2, "a1 b1")?;
        let mut tree = SearchTree::new(board.clone(), Player::One, 4);
        let won = tree.expand(NodeId::ROOT)?[0];
        assert_eq!(tree.get(won).last_move(), Some(&HexMove::new(1, 0)));
        assert!(tree.is_terminal(won));

        // past the horizon only the depth limit ends a branch
        let mut tree = SearchTree::new(board, Player::One, 4).with_outcome_check_limit(Some(0));
        let won = tree.expand(NodeId::ROOT)?[0];
        assert!(!tree.is_terminal(won));
        Ok(())
    }

    #[test]
    fn leaves_follow_the_current_shape() -> Result<()> {
        let mut tree = tree(2, 2)?;
        assert_eq!(tree.find_leaves(NodeId::ROOT).collect::<Vec<_>>(), vec![NodeId::ROOT]);

        let children = tree.expand(NodeId::ROOT)?;
        assert_eq!(tree.find_leaves(NodeId::ROOT).collect::<Vec<_>>(), children);

        let grandchildren = tree.expand(children[1])?;
        let leaves: Vec<_> = tree.find_leaves(NodeId::ROOT).collect();
        assert_eq!(leaves.len(), 3 + grandchildren.len());
        assert_eq!(leaves[0], children[0]);
        assert_eq!(&leaves[1..4], &grandchildren[..]);

        // the walk can be restarted and gives the same answer
        assert_eq!(tree.find_leaves(NodeId::ROOT).collect::<Vec<_>>(), leaves);
        Ok(())
    }

    #[test]
    fn evaluation_follows_depth_parity() -> Result<()> {
        let mut tree = tree(2, 2)?;
        let children = tree.expand(NodeId::ROOT)?;
        let grandchildren = tree.expand(children[0])?;

        for (&id, score) in grandchildren.iter().zip([4.0, -2.0, 7.0]) {
            tree.adopt_score(id, score);
        }
        for (&id, score) in children[1..].iter().zip([-5.0, -1.0, -3.0]) {
            tree.adopt_score(id, score);
        }

        // odd depth takes the minimum, even depth the maximum
        assert_eq!(tree.evaluate_node(children[0])?, -2.0);
        assert_eq!(tree.evaluate_node(NodeId::ROOT)?, -1.0);
        assert_eq!(tree.root().status(), NodeStatus::Evaluated);
        assert_eq!(tree.max_child(NodeId::ROOT), Some(children[2]));
        assert_eq!(tree.min_child(NodeId::ROOT), Some(children[1]));

        // an evaluated score is frozen
        tree.adopt_score(NodeId::ROOT, 100.0);
        assert_eq!(tree.evaluate_node(NodeId::ROOT)?, -1.0);
        Ok(())
    }

    #[test]
    fn ties_go_to_the_first_child() -> Result<()> {
        let mut tree = tree(2, 1)?;
        let children = tree.expand(NodeId::ROOT)?;
        for (&id, score) in children.iter().zip([1.0, 3.0, 3.0, 1.0]) {
            tree.adopt_score(id, score);
        }
        assert_eq!(tree.max_child(NodeId::ROOT), Some(children[1]));
        assert_eq!(tree.min_child(NodeId::ROOT), Some(children[0]));
        assert_eq!(tree.best_move(), tree.get(children[1]).last_move());
        Ok(())
    }

    #[test]
    fn unscored_children_cannot_be_reduced() -> Result<()> {
        let mut tree = tree(2, 2)?;
        tree.expand(NodeId::ROOT)?;
        assert_eq!(
            tree.evaluate_node(NodeId::ROOT),
            Err(SearchError::EmptyChildren { depth: 0 })
        );
        Ok(())
    }

    #[test]
    fn exhausted_nodes_use_the_heuristic() -> Result<()> {
        // a full board has no moves left
        let full = HexBoard::from_moves(2, "a1 b1 b2 a2")?;
        let mut tree = SearchTree::new(full.clone(), Player::One, 3);
        assert!(tree.expand(NodeId::ROOT)?.is_empty());
        assert_eq!(tree.evaluate_node(NodeId::ROOT)?, full.evaluate(Player::One));
        Ok(())
    }

    #[test]
    fn siblings_share_a_parent() -> Result<()> {
        let mut tree = tree(2, 2)?;
        assert!(tree.siblings(NodeId::ROOT).is_empty());

        let children = tree.expand(NodeId::ROOT)?;
        assert_eq!(tree.siblings(children[1]), vec![children[0], children[2], children[3]]);

        let grandchildren = tree.expand(children[0])?;
        assert_eq!(tree.siblings(grandchildren[0]), grandchildren[1..].to_vec());
        Ok(())
    }

    #[test]
    fn dump_lists_nodes_depth_first() -> Result<()> {
        let mut tree = tree(2, 2)?;
        let children = tree.expand(NodeId::ROOT)?;
        tree.expand(children[0])?;

        let dump = tree.dump(NodeId::ROOT);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 1 + 4 + 3);
        assert!(lines[0].starts_with("None depth 0"));
        assert!(lines[1].starts_with(" Some(HexMove"));
        // the first child's own children come before its siblings
        assert!(lines[2].starts_with("  Some(HexMove"));
        assert!(lines[5].starts_with(" Some(HexMove"));
        Ok(())
    }
}
