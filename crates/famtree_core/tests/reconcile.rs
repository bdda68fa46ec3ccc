use famtree_core::{FamilyTree, Person};
use uuid::Uuid;

fn record(json: String) -> Person {
    serde_json::from_str(&json).unwrap()
}

fn person_json(id: Uuid, name: &str, gender: &str, extra: &str) -> String {
    format!(
        r#"{{"id":"{id}","name":"{name}","gender":"{gender}","date_of_birth":null,
            "date_of_death":null,"place_of_birth":null,"occupation":null,"notes":null{extra}}}"#
    )
}

#[test]
fn load_mirrors_one_directional_links() {
    let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let persons = vec![
        record(person_json(
            alice,
            "Alice",
            "female",
            &format!(r#","spouse_ids":["{bob}"]"#),
        )),
        record(person_json(bob, "Bob", "male", "")),
        record(person_json(
            carol,
            "Carol",
            "female",
            &format!(r#","mother_id":"{alice}","father_id":"{bob}""#),
        )),
    ];

    let mut tree = FamilyTree::new();
    let report = tree.load(persons);

    assert_eq!(report.spouse_links_mirrored, 1);
    assert_eq!(report.child_links_mirrored, 2);
    assert!(tree.get(bob).unwrap().spouse_ids().contains(&alice));
    assert!(tree.get(alice).unwrap().children_ids().contains(&carol));
    assert!(tree.get(bob).unwrap().children_ids().contains(&carol));
}

#[test]
fn load_drops_dangling_and_self_references() {
    let (alice, ghost) = (Uuid::new_v4(), Uuid::new_v4());
    let persons = vec![record(person_json(
        alice,
        "Alice",
        "female",
        &format!(r#","mother_id":"{ghost}","father_id":"{alice}","spouse_ids":["{alice}","{ghost}"]"#),
    ))];

    let mut tree = FamilyTree::new();
    let report = tree.load(persons);

    assert_eq!(report.dangling_refs_removed, 2);
    assert_eq!(report.self_refs_removed, 2);
    let loaded = tree.get(alice).unwrap();
    assert!(loaded.is_root());
    assert!(loaded.spouse_ids().is_empty());
}

#[test]
fn load_adopts_children_listed_only_on_parent() {
    let (bob, sam, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let persons = vec![
        record(person_json(
            bob,
            "Bob",
            "male",
            &format!(r#","children_ids":["{carol}"]"#),
        )),
        record(person_json(
            sam,
            "Sam",
            "unknown",
            &format!(r#","children_ids":["{carol}"]"#),
        )),
        record(person_json(carol, "Carol", "female", "")),
    ];

    let mut tree = FamilyTree::new();
    let report = tree.load(persons);

    assert_eq!(report.parent_links_adopted, 1);
    assert_eq!(report.child_links_dropped, 1);
    assert_eq!(tree.get(carol).unwrap().father_id(), Some(bob));
    assert!(tree.get(sam).unwrap().children_ids().is_empty());
}

#[test]
fn load_breaks_ancestry_cycles() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let persons = vec![
        record(person_json(a, "A", "female", &format!(r#","mother_id":"{b}""#))),
        record(person_json(b, "B", "female", &format!(r#","mother_id":"{a}""#))),
    ];

    let mut tree = FamilyTree::new();
    let report = tree.load(persons);

    assert_eq!(report.cycles_broken, 1);
    assert_eq!(tree.get(a).unwrap().mother_id(), None);
    assert_eq!(tree.get(b).unwrap().mother_id(), Some(a));
    assert!(tree.get(a).unwrap().children_ids().contains(&b));
    assert!(!tree.relationships().is_ancestor(b, a));
}

#[test]
fn clean_snapshot_reloads_without_repairs() {
    let mut tree = FamilyTree::new();
    let alice = tree.add_person(Person::new("Alice")).unwrap();
    let bob = tree.add_person(Person::new("Bob")).unwrap();
    tree.set_spouse(alice, bob).unwrap();

    let snapshot = tree.snapshot();
    let json = serde_json::to_string(&snapshot).unwrap();
    let restored: Vec<Person> = serde_json::from_str(&json).unwrap();

    let mut reloaded = FamilyTree::new();
    assert!(reloaded.load(restored).is_clean());
    assert_eq!(reloaded.snapshot(), snapshot);

    reloaded.reset();
    assert!(reloaded.is_empty());
}
