//! The starter tree: one large root, two legs, four leaves.

use scheme_core::geometry::{Bounds, Point};
use scheme_core::graph::BoardGraph;
use scheme_core::id::{CardId, LineId};
use scheme_core::model::{
    CARD_HEIGHT, CARD_WIDTH, Card, LARGE_CARD_WIDTH, Line, Side, default_body,
};

pub const TEMPLATE_HEADER_BG: &str = "rgb(93, 139, 244)";
pub const TEMPLATE_LINE_COLOR: &str = "#3d85c6";
pub const TEMPLATE_LINE_THICKNESS: f32 = 4.0;

struct TemplateCard {
    key: &'static str,
    x: f32,
    y: f32,
    title: &'static str,
    pv: &'static str,
    large: bool,
}

impl TemplateCard {
    fn width(&self) -> f32 {
        if self.large { LARGE_CARD_WIDTH } else { CARD_WIDTH }
    }
}

const CARDS: [TemplateCard; 7] = [
    TemplateCard { key: "lena", x: 2240.0, y: -770.0, title: "Елена", pv: "330/330pv", large: true },
    TemplateCard { key: "a", x: 1750.0, y: -420.0, title: "A", pv: "330/330pv", large: false },
    TemplateCard { key: "c", x: 1470.0, y: -70.0, title: "C", pv: "30/330pv", large: false },
    TemplateCard { key: "d", x: 2030.0, y: -70.0, title: "D", pv: "30/330pv", large: false },
    TemplateCard { key: "b", x: 2870.0, y: -420.0, title: "B", pv: "330/330pv", large: false },
    TemplateCard { key: "e", x: 2590.0, y: -70.0, title: "E", pv: "30/330pv", large: false },
    TemplateCard { key: "f", x: 3150.0, y: -70.0, title: "F", pv: "30/330pv", large: false },
];

/// `(start key, start side, end key, end side)`
const LINES: [(&str, Side, &str, Side); 6] = [
    ("f", Side::Top, "b", Side::Right),
    ("e", Side::Top, "b", Side::Left),
    ("a", Side::Right, "d", Side::Top),
    ("a", Side::Left, "c", Side::Top),
    ("lena", Side::Left, "a", Side::Top),
    ("lena", Side::Right, "b", Side::Top),
];

/// Bounding box of the template in its own coordinates.
pub fn template_bounds() -> Bounds {
    CARDS
        .iter()
        .map(|c| Bounds::new(c.x, c.y, c.width(), CARD_HEIGHT))
        .reduce(|acc, b| acc.union(&b))
        .unwrap_or_default()
}

/// Insert the template with its bounding box's top-left at `origin`.
/// Positions are not snapped. Returns the new card ids in template order.
pub fn instantiate(graph: &mut BoardGraph, origin: Point) -> Vec<CardId> {
    let bounds = template_bounds();
    let (dx, dy) = (origin.x - bounds.x, origin.y - bounds.y);

    let mut by_key: Vec<(&str, CardId)> = Vec::with_capacity(CARDS.len());
    for def in &CARDS {
        let id = CardId::generate();
        let mut card = Card::new(id, Point::new(def.x + dx, def.y + dy));
        card.title = def.title.to_string();
        card.body = default_body(def.pv);
        card.header_bg = TEMPLATE_HEADER_BG.to_string();
        card.color_index = 0;
        if def.large {
            card.width = LARGE_CARD_WIDTH;
            card.explicit_width = true;
        }
        if graph.insert_card(card) {
            by_key.push((def.key, id));
        }
    }

    let lookup = |key: &str| by_key.iter().find(|(k, _)| *k == key).map(|(_, id)| *id);
    for (start_key, start_side, end_key, end_side) in LINES {
        let (Some(start), Some(end)) = (lookup(start_key), lookup(end_key)) else {
            continue;
        };
        graph.insert_line(Line {
            id: LineId::generate(),
            start,
            start_side,
            end,
            end_side,
            color: TEMPLATE_LINE_COLOR.to_string(),
            thickness: TEMPLATE_LINE_THICKNESS,
        });
    }

    log::debug!("template: {} cards at ({}, {})", by_key.len(), origin.x, origin.y);
    by_key.into_iter().map(|(_, id)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheme_core::pv::build_parent_map;
    use scheme_core::model::Branch;

    #[test]
    fn bounds_cover_large_root() {
        let b = template_bounds();
        assert_eq!(b.x, 1470.0);
        assert_eq!(b.y, -770.0);
        assert_eq!(b.right(), 3150.0 + CARD_WIDTH);
        assert_eq!(b.bottom(), -70.0 + CARD_HEIGHT);
    }

    #[test]
    fn instantiate_builds_binary_tree() {
        let mut g = BoardGraph::new();
        let ids = instantiate(&mut g, Point::new(100.0, 35.0));
        assert_eq!(g.cards().len(), 7);
        assert_eq!(g.lines().len(), 6);

        // Top-left of the bounding box lands on the origin, unsnapped.
        let placed = g.content_bounds().unwrap();
        assert_eq!((placed.x, placed.y), (100.0, 35.0));

        let root = g.card(ids[0]).unwrap();
        assert_eq!(root.width, LARGE_CARD_WIDTH);
        assert_eq!(root.header_bg, TEMPLATE_HEADER_BG);

        let parents = build_parent_map(&g);
        assert_eq!(parents.parent_of(ids[1]), Some((ids[0], Branch::Left)));
        assert_eq!(parents.parent_of(ids[4]), Some((ids[0], Branch::Right)));
        assert_eq!(parents.parent_of(ids[6]), Some((ids[4], Branch::Right)));
        assert_eq!(parents.parent_of(ids[0]), None);
    }
}
