//! Active-PV propagation over the card tree.
//!
//! The tree is inferred from lines: a line that enters a card through its
//! `top` anchor from a non-top anchor of another card makes that other card
//! the parent. The parent's anchor side picks the branch (left or right).
//!
//! Active orders accumulate per branch. Every [`PV_UNIT`] collected on one
//! side overflows: the remainder stays, the overflow unit is recorded
//! locally and carried into the parent on the branch this card hangs from.
//! Balance and Cycle rows are derived values rewritten by [`recalculate`].

use crate::body::format_pair;
use crate::graph::BoardGraph;
use crate::id::CardId;
use crate::model::{Branch, Card, Line, Pair, RowKind, Side};
use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use std::collections::{HashMap, HashSet};

/// Active orders per overflow unit.
pub const PV_UNIT: u32 = 330;
/// Balance units per cycle.
pub const CYCLE_DIVISOR: u32 = 72;

/// Parent → child edges weighted by the child's branch.
#[derive(Debug, Clone, Default)]
pub struct ParentMap {
    tree: DiGraphMap<CardId, Branch>,
}

impl ParentMap {
    pub fn parent_of(&self, child: CardId) -> Option<(CardId, Branch)> {
        let parent = self
            .tree
            .neighbors_directed(child, Direction::Incoming)
            .next()?;
        let branch = *self.tree.edge_weight(parent, child)?;
        Some((parent, branch))
    }

    /// Direct children hanging from `parent` on `branch`.
    pub fn children(&self, parent: CardId, branch: Branch) -> impl Iterator<Item = CardId> + '_ {
        self.tree
            .neighbors_directed(parent, Direction::Outgoing)
            .filter(move |&c| self.tree.edge_weight(parent, c) == Some(&branch))
    }

    /// Every card reachable below `root`, including `root` itself.
    fn subtree(&self, root: CardId) -> Vec<CardId> {
        if !self.tree.contains_node(root) {
            return vec![root];
        }
        let mut dfs = Dfs::new(&self.tree, root);
        let mut out = Vec::new();
        while let Some(n) = dfs.next(&self.tree) {
            out.push(n);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.tree.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.edge_count() == 0
    }
}

/// `(parent, child, branch)` if `line` is a tree edge.
fn tree_edge(graph: &BoardGraph, line: &Line) -> Option<(CardId, CardId, Branch)> {
    let (parent, parent_side, child) = match (line.start_side, line.end_side) {
        (Side::Top, Side::Top) => return None,
        (Side::Top, side) => (line.end, side, line.start),
        (side, Side::Top) => (line.start, side, line.end),
        _ => return None,
    };
    let branch = match parent_side {
        Side::Left => Branch::Left,
        Side::Right => Branch::Right,
        Side::Bottom => {
            let p = graph.card(parent)?.center();
            let c = graph.card(child)?.center();
            if c.x > p.x { Branch::Right } else { Branch::Left }
        }
        Side::Top => return None,
    };
    Some((parent, child, branch))
}

/// Derive the parent/child tree from the current lines.
///
/// The first qualifying line for a child wins. Later parents, and edges that
/// would close a cycle, are ignored with a warning.
pub fn build_parent_map(graph: &BoardGraph) -> ParentMap {
    let mut map = ParentMap::default();
    for line in graph.lines() {
        let Some((parent, child, branch)) = tree_edge(graph, line) else {
            continue;
        };
        if map.parent_of(child).is_some() {
            log::warn!("{child} already has a parent; ignoring {parent} via {}", line.id);
            continue;
        }
        if map.tree.contains_node(child)
            && map.tree.contains_node(parent)
            && has_path_connecting(&map.tree, child, parent, None)
        {
            log::warn!("ignoring {} : {parent} -> {child} would close a cycle", line.id);
            continue;
        }
        map.tree.add_edge(parent, child, branch);
    }
    map
}

/// One overflow step recorded by [`increment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Carry {
    pub from: CardId,
    pub to: CardId,
    pub branch: Branch,
    pub units: u32,
}

/// Press a `+step` button on `card`'s `branch`.
///
/// Returns the carries that moved up the tree, or `None` if the card does
/// not exist.
pub fn increment(
    graph: &mut BoardGraph,
    parents: &ParentMap,
    card: CardId,
    branch: Branch,
    step: u32,
) -> Option<Vec<Carry>> {
    graph.card_mut(card)?.active.add_button(branch, step);

    let mut carries = Vec::new();
    let mut visited = HashSet::new();
    let (mut current, mut side, mut amount) = (card, branch, step);

    while visited.insert(current) {
        let Some(c) = graph.card_mut(current) else {
            break;
        };
        let mut orders = c.active_orders();
        let total = orders.get(side).saturating_add(amount);
        let units = total / PV_UNIT;
        *orders.get_mut(side) = total % PV_UNIT;
        c.set_active_orders(orders);
        if units == 0 {
            break;
        }
        c.active.add_local_overflow(side, units);

        let Some((parent, child_branch)) = parents.parent_of(current) else {
            log::debug!("{current}: {units} overflow unit(s) absorbed at root");
            break;
        };
        if let Some(p) = graph.card_mut(parent) {
            p.active.add_carry_bonus(child_branch, units);
        }
        log::debug!("{current}: carry {units} to {parent} ({child_branch:?})");
        carries.push(Carry {
            from: current,
            to: parent,
            branch: child_branch,
            units,
        });
        current = parent;
        side = child_branch;
        amount = units;
    }
    Some(carries)
}

/// Reset a card's active orders, button counters and local overflow.
/// Carry bonuses, and anything already pushed into ancestors, stay.
pub fn clear(graph: &mut BoardGraph, card: CardId) -> bool {
    let Some(c) = graph.card_mut(card) else {
        return false;
    };
    c.set_active_orders(Pair::default());
    c.active.button_left = 0;
    c.active.button_right = 0;
    c.active.local_overflow_left = 0;
    c.active.local_overflow_right = 0;
    true
}

/// Counts of full cards under each branch of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BranchTotals {
    pub left: u32,
    pub right: u32,
}

impl BranchTotals {
    pub fn total(&self) -> u32 {
        self.left.saturating_add(self.right)
    }
}

/// Whether a card's PV target is met. Cards without a readable PV value
/// keep their stored coin state.
pub fn is_full(card: &Card) -> bool {
    card.pv_progress()
        .map(|p| p.is_full())
        .unwrap_or(card.coin_full)
}

/// Balance shown for a card: subtree counts plus carried and local overflow.
pub fn balance(card: &Card, totals: BranchTotals) -> Pair {
    let a = &card.active;
    Pair::new(
        totals
            .left
            .saturating_add(a.carry_bonus_left)
            .saturating_add(a.local_overflow_left),
        totals
            .right
            .saturating_add(a.carry_bonus_right)
            .saturating_add(a.local_overflow_right),
    )
}

pub fn cycle(card: &Card, totals: BranchTotals) -> u32 {
    totals
        .total()
        .saturating_add(card.active.carry_bonus_left)
        .saturating_add(card.active.carry_bonus_right)
        / CYCLE_DIVISOR
}

/// Recompute coin state, Balance and Cycle rows for every card.
pub fn recalculate(graph: &mut BoardGraph, parents: &ParentMap) -> HashMap<CardId, BranchTotals> {
    let full: HashSet<CardId> = graph
        .cards()
        .iter()
        .filter(|c| is_full(c))
        .map(|c| c.id)
        .collect();

    let count_under = |id: CardId, branch: Branch| -> u32 {
        parents
            .children(id, branch)
            .flat_map(|child| parents.subtree(child))
            .filter(|n| full.contains(n))
            .count() as u32
    };

    let totals: HashMap<CardId, BranchTotals> = graph
        .cards()
        .iter()
        .map(|c| {
            let t = BranchTotals {
                left: count_under(c.id, Branch::Left),
                right: count_under(c.id, Branch::Right),
            };
            (c.id, t)
        })
        .collect();

    for card in graph.cards_mut() {
        let t = totals.get(&card.id).copied().unwrap_or_default();
        card.coin_full = full.contains(&card.id);
        let bal = balance(card, t);
        let cyc = cycle(card, t);
        if let Some(row) = card.row_mut(RowKind::Balance) {
            row.value = format_pair(bal);
        }
        if let Some(row) = card.row_mut(RowKind::Cycle) {
            row.value = cyc.to_string();
        }
    }
    log::trace!("recalculated {} cards", totals.len());
    totals
}
