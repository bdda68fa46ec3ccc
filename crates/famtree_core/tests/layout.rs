use famtree_core::{
    compute_layout, ConnectorKind, FamilyTree, Gender, LayoutConfig, ParentRole, Person, Point,
    PersonStore, Segment,
};
use uuid::Uuid;

struct Couple {
    tree: FamilyTree,
    alice: Uuid,
    bob: Uuid,
    carol: Uuid,
}

fn alice_bob_carol() -> Couple {
    let mut tree = FamilyTree::new();
    let alice = tree
        .add_person(Person::new("Alice").with_gender(Gender::Female))
        .unwrap();
    let bob = tree
        .add_person(Person::new("Bob").with_gender(Gender::Male))
        .unwrap();
    let carol = tree
        .add_person(Person::new("Carol").with_gender(Gender::Female))
        .unwrap();
    tree.set_spouse(alice, bob).unwrap();
    tree.set_parents(carol, alice, bob).unwrap();
    Couple {
        tree,
        alice,
        bob,
        carol,
    }
}

#[test]
fn empty_graph_yields_empty_layout() {
    let layout = compute_layout(&PersonStore::new(), &LayoutConfig::default());
    assert!(layout.is_empty());
    assert!(layout.units.is_empty());
    assert!(layout.connectors.is_empty());
}

#[test]
fn couple_and_child_are_placed_as_expected() {
    let Couple {
        mut tree,
        alice,
        bob,
        carol,
    } = alice_bob_carol();
    let layout = tree.compute_layout();

    assert_eq!(layout.position(alice), Some(Point::new(50.0, 50.0)));
    assert_eq!(layout.position(bob), Some(Point::new(180.0, 50.0)));
    assert_eq!(layout.position(carol), Some(Point::new(115.0, 210.0)));
    assert_eq!(layout.generations[&alice], 0);
    assert_eq!(layout.generations[&bob], 0);
    assert_eq!(layout.generations[&carol], 1);

    let couple = layout.unit_of(alice).unwrap();
    assert_eq!(couple.members, vec![alice, bob]);
    assert_eq!(couple.center_x, 175.0);

    let parents = layout
        .connectors
        .iter()
        .find(|connector| matches!(connector.kind, ConnectorKind::Parents { .. }))
        .unwrap();
    assert_eq!(
        parents.kind,
        ConnectorKind::Parents {
            parents: [alice, bob],
            child: carol
        }
    );
    assert_eq!(
        parents.segments,
        vec![
            Segment::new(Point::new(110.0, 110.0), Point::new(240.0, 110.0)),
            Segment::new(Point::new(175.0, 110.0), Point::new(175.0, 210.0)),
        ]
    );
    assert_eq!(layout.connectors.len(), 2);

    // Computed positions are cached on the store.
    assert_eq!(tree.layout_position(carol), Some(Point::new(115.0, 210.0)));
}

#[test]
fn deleting_bob_leaves_single_parent_connector() {
    let Couple {
        mut tree,
        alice,
        bob,
        carol,
    } = alice_bob_carol();
    tree.remove_person(bob);
    let layout = tree.layout();

    assert_eq!(layout.position(alice), Some(Point::new(50.0, 50.0)));
    assert_eq!(layout.position(carol), Some(Point::new(50.0, 210.0)));
    assert_eq!(layout.connectors.len(), 1);
    assert_eq!(
        layout.connectors[0].kind,
        ConnectorKind::ParentChild {
            parent: alice,
            child: carol
        }
    );
    assert_eq!(
        layout.connectors[0].segments,
        vec![Segment::new(
            Point::new(110.0, 110.0),
            Point::new(110.0, 210.0)
        )]
    );
}

#[test]
fn layout_is_deterministic() {
    let Couple { mut tree, alice, .. } = alice_bob_carol();
    for name in ["Dave", "Erin", "Finn"] {
        tree.add_child_of(alice, Person::new(name), Some(ParentRole::Mother))
            .unwrap();
    }
    tree.add_person(Person::new("Loner")).unwrap();

    assert_eq!(tree.layout(), tree.layout());
    let first = tree.compute_layout();
    let second = tree.compute_layout();
    assert_eq!(first, second);
}

#[test]
fn sibling_subtrees_do_not_overlap() {
    let mut tree = FamilyTree::new();
    let root = tree
        .add_person(Person::new("Root").with_gender(Gender::Female))
        .unwrap();
    let mut children = Vec::new();
    for name in ["A", "B", "C"] {
        let child = tree
            .add_child_of(root, Person::new(name).with_gender(Gender::Male), None)
            .unwrap();
        children.push(child);
    }
    // Give the middle child a wide family.
    let partner = tree.add_spouse_of(children[1], Person::new("P")).unwrap();
    for name in ["G1", "G2", "G3"] {
        tree.add_child_of(children[1], Person::new(name), None)
            .unwrap();
    }

    let layout = tree.layout();
    let mut spans: Vec<(f64, f64)> = children
        .iter()
        .map(|child| {
            let unit = layout.unit_of(*child).unwrap();
            (unit.left, unit.right)
        })
        .collect();
    spans.sort_by(|a, b| a.0.total_cmp(&b.0));
    for pair in spans.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "spans overlap: {pair:?}");
    }
    assert!(layout.unit_of(partner).unwrap().members.contains(&children[1]));

    let config = LayoutConfig::default();
    let mut boxes: Vec<(f64, f64, usize)> = layout
        .positions
        .iter()
        .map(|(id, point)| (point.x, point.x + config.node_width, layout.generations[id]))
        .collect();
    boxes.sort_by(|a, b| a.2.cmp(&b.2).then(a.0.total_cmp(&b.0)));
    for pair in boxes.windows(2) {
        if pair[0].2 == pair[1].2 {
            assert!(pair[0].1 <= pair[1].0, "nodes overlap: {pair:?}");
        }
    }
}

#[test]
fn isolated_persons_take_next_root_slot() {
    let mut tree = FamilyTree::new();
    let a = tree.add_person(Person::new("A")).unwrap();
    let b = tree.add_person(Person::new("B")).unwrap();

    let layout = tree.layout();
    assert_eq!(layout.position(a), Some(Point::new(50.0, 50.0)));
    assert_eq!(layout.position(b), Some(Point::new(210.0, 50.0)));
}

#[test]
fn cyclic_input_still_terminates() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let json = format!(
        r#"[{{"id":"{a}","name":"A","date_of_birth":null,"date_of_death":null,
              "place_of_birth":null,"occupation":null,"notes":null,"mother_id":"{b}"}},
            {{"id":"{b}","name":"B","date_of_birth":null,"date_of_death":null,
              "place_of_birth":null,"occupation":null,"notes":null,"mother_id":"{a}"}}]"#
    );
    let persons: Vec<Person> = serde_json::from_str(&json).unwrap();

    let mut tree = FamilyTree::new();
    tree.load(persons);
    let layout = tree.layout();
    assert_eq!(layout.positions.len(), 2);
    assert_eq!(layout.generations[&a], 0);
    assert_eq!(layout.generations[&b], 1);
}

#[test]
fn custom_config_changes_spacing() {
    let config = LayoutConfig {
        level_spacing: 200.0,
        origin: Point::new(0.0, 0.0),
        ..LayoutConfig::default()
    };
    let Couple { tree, carol, .. } = alice_bob_carol();
    let mut tree = tree;
    tree.set_layout_config(config).unwrap();

    let layout = tree.layout();
    assert_eq!(layout.position(carol), Some(Point::new(65.0, 200.0)));

    let hit = layout.hit_test(Point::new(70.0, 210.0), &config);
    assert_eq!(hit, Some(carol));
}

#[test]
fn every_marriage_gets_a_spouse_connector() {
    let mut tree = FamilyTree::new();
    let a = tree
        .add_person(Person::new("A").with_gender(Gender::Male))
        .unwrap();
    let b = tree.add_spouse_of(a, Person::new("B")).unwrap();
    let c = tree.add_spouse_of(a, Person::new("C")).unwrap();

    let layout = tree.layout();
    let spouses: Vec<ConnectorKind> = layout
        .connectors
        .iter()
        .map(|connector| connector.kind)
        .filter(|kind| matches!(kind, ConnectorKind::Spouses { .. }))
        .collect();
    assert_eq!(
        spouses,
        vec![
            ConnectorKind::Spouses { a, b },
            ConnectorKind::Spouses { a, b: c },
        ]
    );
    // C sits outside the A+B couple unit but is still drawn as married.
    assert!(!layout.unit_of(a).unwrap().members.contains(&c));
}

#[test]
fn user_positions_survive_relayout() {
    let Couple {
        mut tree,
        alice,
        carol,
        ..
    } = alice_bob_carol();
    tree.compute_layout();
    tree.set_layout_position(carol, Point::new(400.0, 300.0))
        .unwrap();

    let layout = tree.compute_layout();
    assert_eq!(layout.position(carol), Some(Point::new(400.0, 300.0)));
    assert_eq!(tree.layout_position(carol), Some(Point::new(400.0, 300.0)));
    assert_eq!(layout.position(alice), Some(Point::new(50.0, 50.0)));
    let parents = layout
        .connectors
        .iter()
        .find(|connector| matches!(connector.kind, ConnectorKind::Parents { .. }))
        .unwrap();
    assert_eq!(
        parents.segments.last().unwrap().end,
        Point::new(460.0, 300.0)
    );

    tree.clear_layout_positions();
    let layout = tree.compute_layout();
    assert_eq!(layout.position(carol), Some(Point::new(115.0, 210.0)));
}
