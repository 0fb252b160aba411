//! Per-side repertoire tree, stored as an arena of nodes.
//!
//! Nodes are matched by exact SAN per ply. Two move orders that reach the same
//! position are separate branches.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{line_to_pgn, side_of_last_move, BySide, PendingLine, Side};

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepertoireNode {
    /// PGN of the line up to and including this move, e.g. `1.e4 e5 2.f4`
    pub line_id: String,
    pub san: String,
    /// Side that plays this move
    pub side: Side,
    /// Whether this is a move the repertoire owner plays
    pub mine: bool,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SideTreeWire", into = "SideTreeWire")]
pub struct RepertoireTree {
    side: Side,
    nodes: Vec<RepertoireNode>,
    roots: Vec<NodeId>,
}

impl RepertoireTree {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &RepertoireNode {
        &self.nodes[id]
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Children of `parent`, or the roots when `parent` is `None`.
    pub fn children(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(id) => &self.nodes[id].children,
            None => &self.roots,
        }
    }

    fn child_with_san(&self, parent: Option<NodeId>, san: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&id| self.nodes[id].san == san)
    }

    /// Node reached by following `line` from the roots.
    pub fn find_node<S: AsRef<str>>(&self, line: &[S]) -> Option<NodeId> {
        let mut node = None;
        for san in line {
            node = Some(self.child_with_san(node, san.as_ref())?);
        }
        node
    }

    /// Split `history` at the first move the tree does not know.
    /// `None` when every move is already present.
    pub fn pending_line<S: AsRef<str>>(&self, history: &[S]) -> Option<PendingLine> {
        let mut node = None;
        let mut known = 0;
        for san in history {
            match self.child_with_san(node, san.as_ref()) {
                Some(id) => {
                    node = Some(id);
                    known += 1;
                }
                None => break,
            }
        }
        if known == history.len() {
            return None;
        }
        let to_owned = |moves: &[S]| -> Vec<String> {
            moves.iter().map(|m| m.as_ref().to_string()).collect()
        };
        Some(PendingLine {
            known_line: to_owned(&history[..known]),
            pending_line: to_owned(&history[known..]),
        })
    }

    /// Append `pending.pending_line` below the end of `pending.known_line`.
    /// Returns the number of nodes added.
    pub fn add_pending_line(&mut self, pending: &PendingLine) -> usize {
        let mut parent = None;
        let mut line: Vec<String> = Vec::new();
        let mut added = 0;
        for san in pending.known_line.iter().chain(&pending.pending_line) {
            line.push(san.clone());
            if let Some(existing) = self.child_with_san(parent, san) {
                parent = Some(existing);
                continue;
            }
            let mover = side_of_last_move(&line);
            let id = self.nodes.len();
            self.nodes.push(RepertoireNode {
                line_id: line_to_pgn(&line),
                san: san.clone(),
                side: mover,
                mine: mover == self.side,
                children: Vec::new(),
            });
            match parent {
                Some(p) => self.nodes[p].children.push(id),
                None => self.roots.push(id),
            }
            debug!(line_id = %self.nodes[id].line_id, "Added repertoire move");
            parent = Some(id);
            added += 1;
        }
        added
    }

    /// Insert `history`, returning the number of new nodes.
    pub fn add_line<S: AsRef<str>>(&mut self, history: &[S]) -> usize {
        match self.pending_line(history) {
            Some(pending) => self.add_pending_line(&pending),
            None => 0,
        }
    }

    /// Every root-to-leaf line, depth first.
    pub fn lines(&self) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        let mut stack: Vec<(NodeId, Vec<String>)> = self
            .roots
            .iter()
            .rev()
            .map(|&id| (id, vec![self.nodes[id].san.clone()]))
            .collect();
        while let Some((id, line)) = stack.pop() {
            let node = &self.nodes[id];
            if node.children.is_empty() {
                out.push(line);
                continue;
            }
            for &child in node.children.iter().rev() {
                let mut next = line.clone();
                next.push(self.nodes[child].san.clone());
                stack.push((child, next));
            }
        }
        out
    }
}

/// Both sides' trees
pub type Repertoire = BySide<RepertoireTree>;

pub fn empty_repertoire() -> Repertoire {
    BySide {
        white: RepertoireTree::new(Side::White),
        black: RepertoireTree::new(Side::Black),
    }
}

/// Starter repertoire for new users: 1.e4 meeting 1...e5 with the King's Gambit.
pub fn default_repertoire() -> Repertoire {
    let mut repertoire = empty_repertoire();
    repertoire.white.add_line(&["e4", "e5", "f4"]);
    repertoire.white.add_line(&["e4", "d5"]);
    repertoire
}

// Nested form used for storage and the grading service.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeWire {
    id: String,
    san_plus: String,
    mine: bool,
    side: Side,
    #[serde(default)]
    responses: Vec<NodeWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SideTreeWire {
    side: Side,
    #[serde(default)]
    tree: Vec<NodeWire>,
}

impl From<RepertoireTree> for SideTreeWire {
    fn from(tree: RepertoireTree) -> Self {
        fn build(tree: &RepertoireTree, id: NodeId) -> NodeWire {
            let node = &tree.nodes[id];
            NodeWire {
                id: node.line_id.clone(),
                san_plus: node.san.clone(),
                mine: node.mine,
                side: node.side,
                responses: node.children.iter().map(|&c| build(tree, c)).collect(),
            }
        }
        SideTreeWire {
            side: tree.side,
            tree: tree.roots.iter().map(|&id| build(&tree, id)).collect(),
        }
    }
}

impl From<SideTreeWire> for RepertoireTree {
    fn from(wire: SideTreeWire) -> Self {
        fn flatten(tree: &mut RepertoireTree, node: NodeWire) -> NodeId {
            let id = tree.nodes.len();
            tree.nodes.push(RepertoireNode {
                line_id: node.id,
                san: node.san_plus,
                side: node.side,
                mine: node.mine,
                children: Vec::new(),
            });
            for child in node.responses {
                let child_id = flatten(tree, child);
                tree.nodes[id].children.push(child_id);
            }
            id
        }
        let mut tree = RepertoireTree::new(wire.side);
        for root in wire.tree {
            let id = flatten(&mut tree, root);
            tree.roots.push(id);
        }
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_line_splits_at_first_unknown_move() {
        let mut tree = RepertoireTree::new(Side::White);
        tree.add_line(&["e4", "e5"]);
        let pending = tree.pending_line(&["e4", "e5", "Nf3"]).unwrap();
        assert_eq!(pending.known_line, vec!["e4", "e5"]);
        assert_eq!(pending.pending_line, vec!["Nf3"]);
    }

    #[test]
    fn test_known_line_has_no_pending() {
        let tree = default_repertoire().white;
        assert_eq!(tree.pending_line(&["e4", "e5", "f4"]), None);
        assert_eq!(tree.pending_line(&["e4"]), None);
        assert_eq!(tree.pending_line::<&str>(&[]), None);
    }

    #[test]
    fn test_add_then_lookup_round_trip() {
        let mut tree = default_repertoire().white;
        let history = ["e4", "c5", "Nf3", "d6", "d4"];
        let added = tree.add_line(&history);
        assert_eq!(added, 4);
        assert_eq!(tree.pending_line(&history), None);
        assert_eq!(tree.add_line(&history), 0);
    }

    #[test]
    fn test_new_nodes_carry_line_id_and_owner() {
        let mut tree = RepertoireTree::new(Side::Black);
        tree.add_line(&["d4", "Nf6", "c4"]);
        let id = tree.find_node(&["d4", "Nf6"]).unwrap();
        let node = tree.node(id);
        assert_eq!(node.line_id, "1.d4 Nf6");
        assert_eq!(node.side, Side::Black);
        assert!(node.mine);
        let first = tree.node(tree.roots()[0]);
        assert!(!first.mine);
        assert_eq!(first.side, Side::White);
    }

    #[test]
    fn test_transpositions_stay_separate() {
        let mut tree = RepertoireTree::new(Side::White);
        tree.add_line(&["d4", "Nf6", "c4", "e6"]);
        tree.add_line(&["c4", "e6", "d4", "Nf6"]);
        assert_eq!(tree.roots().len(), 2);
        assert_eq!(tree.len(), 8);
    }

    #[test]
    fn test_serialized_shape_matches_nested_form() {
        let json = serde_json::to_value(&default_repertoire().white).unwrap();
        assert_eq!(json["side"], "white");
        assert_eq!(json["tree"][0]["id"], "1.e4");
        assert_eq!(json["tree"][0]["sanPlus"], "e4");
        assert_eq!(json["tree"][0]["responses"][0]["id"], "1.e4 e5");
        assert_eq!(json["tree"][0]["responses"][0]["responses"][0]["id"], "1.e4 e5 2.f4");
        assert_eq!(json["tree"][0]["responses"][1]["sanPlus"], "d5");
        assert_eq!(json["tree"][0]["responses"][1]["mine"], false);
    }

    #[test]
    fn test_serde_round_trip_preserves_tree() {
        let original = default_repertoire();
        let raw = serde_json::to_string(&original).unwrap();
        let restored: Repertoire = serde_json::from_str(&raw).unwrap();
        assert_eq!(restored.white.lines(), original.white.lines());
        assert!(restored.black.is_empty());
    }

    #[test]
    fn test_lines_lists_leaves_in_order() {
        let tree = default_repertoire().white;
        assert_eq!(
            tree.lines(),
            vec![vec!["e4", "e5", "f4"], vec!["e4", "d5"]]
        );
    }
}
