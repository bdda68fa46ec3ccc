//! Generational tree layout.
//!
//! # Invariants
//! - Pure: reads the store, never writes it. Same graph, same output.
//! - Every pass is iterative and visits each unit a bounded number of times,
//!   so corrupt cyclic data cannot recurse or loop forever.
//! - Sibling subtrees under one parent unit occupy disjoint x ranges.

use super::config::LayoutConfig;
use super::connector::{self, Connector, ConnectorKind, NodeBox};
use crate::model::geometry::Point;
use crate::model::person::PersonId;
use crate::repo::person_store::PersonStore;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// One or two persons laid out as a single node group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutUnit {
    /// One member, or a couple in store order (left to right).
    pub members: Vec<PersonId>,
    pub generation: usize,
    /// Horizontal span reserved for this unit and its layout subtree.
    pub left: f64,
    pub right: f64,
    /// Center line the members are arranged around.
    pub center_x: f64,
}

impl LayoutUnit {
    pub fn subtree_width(&self) -> f64 {
        self.right - self.left
    }
}

/// Result of `compute_layout`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeLayout {
    /// Node top-left corners.
    pub positions: HashMap<PersonId, Point>,
    /// Person → generation depth (roots are 0).
    pub generations: HashMap<PersonId, usize>,
    /// Units ordered by their first member's store position.
    pub units: Vec<LayoutUnit>,
    pub connectors: Vec<Connector>,
}

impl TreeLayout {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self, id: PersonId) -> Option<Point> {
        self.positions.get(&id).copied()
    }

    /// Returns the unit containing `id`.
    pub fn unit_of(&self, id: PersonId) -> Option<&LayoutUnit> {
        self.units.iter().find(|unit| unit.members.contains(&id))
    }

    /// Returns the person whose node contains `point`, if any.
    pub fn hit_test(&self, point: Point, config: &LayoutConfig) -> Option<PersonId> {
        self.units
            .iter()
            .flat_map(|unit| unit.members.iter())
            .copied()
            .find(|id| {
                self.positions
                    .get(id)
                    .is_some_and(|top_left| node_box(*top_left, config).contains(point))
            })
    }
}

/// Pairs spouses into couples.
///
/// In store order, each unpaired person takes their first unpaired spouse
/// (also in store order). Returns a symmetric person → partner map.
pub fn pair_couples(store: &PersonStore) -> HashMap<PersonId, PersonId> {
    let mut partners = HashMap::new();
    for person in store.all() {
        if partners.contains_key(&person.id) {
            continue;
        }
        let partner = store.ids().iter().copied().find(|candidate| {
            *candidate != person.id
                && person.spouse_ids().contains(candidate)
                && !partners.contains_key(candidate)
        });
        if let Some(partner) = partner {
            partners.insert(person.id, partner);
            partners.insert(partner, person.id);
        }
    }
    partners
}

/// Returns the spouse `id` shares a couple-unit with, if any.
pub fn couple_partner(store: &PersonStore, id: PersonId) -> Option<PersonId> {
    pair_couples(store).get(&id).copied()
}

/// Computes node positions and connector geometry for the whole graph.
pub fn compute_layout(store: &PersonStore, config: &LayoutConfig) -> TreeLayout {
    if store.is_empty() {
        return TreeLayout::default();
    }

    let units = build_units(store);
    let unit_of: HashMap<PersonId, usize> = units
        .iter()
        .enumerate()
        .flat_map(|(index, members)| members.iter().map(move |id| (*id, index)))
        .collect();
    let parent_units = parent_units(store, &units, &unit_of);
    let depths = unit_depths(&parent_units);
    let primary = primary_parents(&parent_units, &depths);

    let mut layout_children: Vec<Vec<usize>> = vec![Vec::new(); units.len()];
    let mut roots = Vec::new();
    for (unit, parent) in primary.iter().enumerate() {
        match parent {
            Some(parent) => layout_children[*parent].push(unit),
            None => roots.push(unit),
        }
    }

    let widths = subtree_widths(&units, &layout_children, &depths, config);
    let spans = assign_spans(&roots, &layout_children, &widths, config);

    let mut layout = TreeLayout::default();
    for (index, members) in units.iter().enumerate() {
        let (left, right) = spans[index];
        let center_x = (left + right) / 2.0;
        let depth = depths[index];
        let y = config.origin.y + depth as f64 * config.level_spacing;
        let unit_width = unit_width(members.len(), config);
        let mut x = center_x - unit_width / 2.0;
        for id in members {
            layout.positions.insert(*id, Point::new(x, y));
            layout.generations.insert(*id, depth);
            x += config.node_width + config.spouse_gap;
        }
        layout.units.push(LayoutUnit {
            members: members.clone(),
            generation: depth,
            left,
            right,
            center_x,
        });
    }

    for person in store.all().filter(|person| person.is_layout_pinned()) {
        if let Some(pinned) = person.layout_position() {
            layout.positions.insert(person.id, pinned);
        }
    }

    layout.connectors = build_connectors(store, &layout.positions, config);
    debug!(
        "event=compute_layout module=layout status=ok persons={} units={} roots={} connectors={}",
        store.len(),
        units.len(),
        roots.len(),
        layout.connectors.len()
    );
    layout
}

pub(crate) fn node_box(top_left: Point, config: &LayoutConfig) -> NodeBox {
    NodeBox {
        top_left,
        width: config.node_width,
        height: config.node_height,
    }
}

fn unit_width(members: usize, config: &LayoutConfig) -> f64 {
    if members > 1 {
        config.couple_width()
    } else {
        config.node_width
    }
}

fn build_units(store: &PersonStore) -> Vec<Vec<PersonId>> {
    let partners = pair_couples(store);
    let mut placed = BTreeSet::new();
    let mut units = Vec::new();
    for id in store.ids() {
        if !placed.insert(*id) {
            continue;
        }
        let mut members = vec![*id];
        if let Some(partner) = partners.get(id) {
            placed.insert(*partner);
            members.push(*partner);
        }
        units.push(members);
    }
    units
}

/// Distinct parent units per unit, in unit order. Self edges are skipped.
fn parent_units(
    store: &PersonStore,
    units: &[Vec<PersonId>],
    unit_of: &HashMap<PersonId, usize>,
) -> Vec<Vec<usize>> {
    units
        .iter()
        .enumerate()
        .map(|(index, members)| {
            let parents: BTreeSet<usize> = members
                .iter()
                .filter_map(|id| store.get(*id))
                .flat_map(|person| [person.mother_id(), person.father_id()])
                .flatten()
                .filter_map(|parent| unit_of.get(&parent).copied())
                .filter(|parent| *parent != index)
                .collect();
            parents.into_iter().collect()
        })
        .collect()
}

/// Longest-path depth via Kahn's algorithm.
///
/// When the queue drains with units left over (a cycle), the first leftover
/// unit in order is treated as placed using its already processed parents.
fn unit_depths(parent_units: &[Vec<usize>]) -> Vec<usize> {
    let count = parent_units.len();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut pending: Vec<usize> = vec![0; count];
    for (unit, parents) in parent_units.iter().enumerate() {
        pending[unit] = parents.len();
        for parent in parents {
            children[*parent].push(unit);
        }
    }

    let mut depths = vec![0usize; count];
    let mut processed = vec![false; count];
    let mut queue: VecDeque<usize> = (0..count).filter(|unit| pending[*unit] == 0).collect();
    let mut done = 0usize;

    while done < count {
        let unit = match queue.pop_front() {
            Some(unit) => unit,
            None => {
                let Some(stuck) = (0..count).find(|unit| !processed[*unit]) else {
                    break;
                };
                depths[stuck] = parent_units[stuck]
                    .iter()
                    .filter(|parent| processed[**parent])
                    .map(|parent| depths[*parent] + 1)
                    .max()
                    .unwrap_or(0);
                stuck
            }
        };
        if processed[unit] {
            continue;
        }
        processed[unit] = true;
        done += 1;
        for child in &children[unit] {
            if processed[*child] {
                continue;
            }
            depths[*child] = depths[*child].max(depths[unit] + 1);
            pending[*child] = pending[*child].saturating_sub(1);
            if pending[*child] == 0 {
                queue.push_back(*child);
            }
        }
    }
    depths
}

/// Deepest parent unit strictly shallower than the unit; ties go to the
/// parent unit that comes first in store order.
fn primary_parents(parent_units: &[Vec<usize>], depths: &[usize]) -> Vec<Option<usize>> {
    parent_units
        .iter()
        .enumerate()
        .map(|(unit, parents)| {
            parents
                .iter()
                .copied()
                .filter(|parent| depths[*parent] < depths[unit])
                .fold(None, |best: Option<usize>, parent| match best {
                    Some(current) if depths[current] >= depths[parent] => Some(current),
                    _ => Some(parent),
                })
        })
        .collect()
}

/// Bottom-up widths. Layout children are strictly deeper than their parent,
/// so visiting by descending depth sees every child first.
fn subtree_widths(
    units: &[Vec<PersonId>],
    layout_children: &[Vec<usize>],
    depths: &[usize],
    config: &LayoutConfig,
) -> Vec<f64> {
    let mut order: Vec<usize> = (0..units.len()).collect();
    order.sort_by(|a, b| depths[*b].cmp(&depths[*a]).then(a.cmp(b)));

    let mut widths = vec![0.0; units.len()];
    for unit in order {
        let own = unit_width(units[unit].len(), config);
        let kids = &layout_children[unit];
        let block = children_block_width(kids, &widths, config);
        widths[unit] = if kids.is_empty() { own } else { own.max(block) };
    }
    widths
}

fn children_block_width(children: &[usize], widths: &[f64], config: &LayoutConfig) -> f64 {
    if children.is_empty() {
        return 0.0;
    }
    let total: f64 = children.iter().map(|child| widths[*child]).sum();
    total + config.h_spacing * (children.len() - 1) as f64
}

/// Top-down `(left, right)` span per unit.
fn assign_spans(
    roots: &[usize],
    layout_children: &[Vec<usize>],
    widths: &[f64],
    config: &LayoutConfig,
) -> Vec<(f64, f64)> {
    let mut spans = vec![(0.0, 0.0); widths.len()];
    let mut stack: Vec<(usize, f64)> = Vec::new();

    let mut cursor = config.origin.x;
    for root in roots {
        stack.push((*root, cursor));
        cursor += widths[*root] + config.h_spacing;
    }
    stack.reverse();

    while let Some((unit, left)) = stack.pop() {
        let right = left + widths[unit];
        spans[unit] = (left, right);
        let kids = &layout_children[unit];
        let center = (left + right) / 2.0;
        let mut child_left = center - children_block_width(kids, widths, config) / 2.0;
        for child in kids {
            stack.push((*child, child_left));
            child_left += widths[*child] + config.h_spacing;
        }
    }
    spans
}

fn build_connectors(
    store: &PersonStore,
    positions: &HashMap<PersonId, Point>,
    config: &LayoutConfig,
) -> Vec<Connector> {
    let boxed = |id: PersonId| positions.get(&id).map(|point| node_box(*point, config));
    let order = store.order_index();
    let mut connectors = Vec::new();

    // Every marriage once, including spouses outside the person's couple unit.
    for person in store.all() {
        let Some(first) = boxed(person.id) else {
            continue;
        };
        let rank = order.get(&person.id).copied().unwrap_or(usize::MAX);
        for spouse in store.ids() {
            let later = order.get(spouse).is_some_and(|index| *index > rank);
            if !later || !person.spouse_ids().contains(spouse) {
                continue;
            }
            if let Some(second) = boxed(*spouse) {
                connectors.push(Connector {
                    kind: ConnectorKind::Spouses {
                        a: person.id,
                        b: *spouse,
                    },
                    segments: connector::spouses(&first, &second),
                });
            }
        }
    }

    for person in store.all() {
        let Some(child_box) = boxed(person.id) else {
            continue;
        };
        let mother = person.mother_id().and_then(|id| boxed(id).map(|b| (id, b)));
        let father = person.father_id().and_then(|id| boxed(id).map(|b| (id, b)));
        let connector = match (mother, father) {
            (Some((mother, mother_box)), Some((father, father_box))) => {
                // Bar runs left to right regardless of role.
                let (first, second) = if mother_box.top_left.x <= father_box.top_left.x {
                    (mother_box, father_box)
                } else {
                    (father_box, mother_box)
                };
                Connector {
                    kind: ConnectorKind::Parents {
                        parents: [mother, father],
                        child: person.id,
                    },
                    segments: connector::two_parents(&first, &second, &child_box),
                }
            }
            (Some((parent, parent_box)), None) | (None, Some((parent, parent_box))) => Connector {
                kind: ConnectorKind::ParentChild {
                    parent,
                    child: person.id,
                },
                segments: connector::parent_child(&parent_box, &child_box),
            },
            (None, None) => continue,
        };
        connectors.push(connector);
    }
    connectors
}
