//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `famtree_core` linkage.
//! - Print a deterministic sample layout for quick local sanity checks.

use famtree_core::{ConnectorKind, FamilyTree, Gender, Person, RelationshipError};

fn main() -> Result<(), RelationshipError> {
    println!("famtree_core version={}", famtree_core::core_version());

    let mut tree = FamilyTree::new();
    let alice = tree.add_person(Person::new("Alice").with_gender(Gender::Female))?;
    let bob = tree.add_spouse_of(alice, Person::new("Bob").with_gender(Gender::Male))?;
    tree.add_child_of(bob, Person::new("Carol").with_gender(Gender::Female), None)?;

    let layout = tree.layout();
    for person in tree.all() {
        if let Some(point) = layout.position(person.id) {
            let generation = layout.generations.get(&person.id).copied().unwrap_or_default();
            println!(
                "node name={} generation={generation} x={} y={}",
                person.name, point.x, point.y
            );
        }
    }
    for connector in &layout.connectors {
        let kind = match connector.kind {
            ConnectorKind::ParentChild { .. } => "parent_child",
            ConnectorKind::Parents { .. } => "parents",
            ConnectorKind::Spouses { .. } => "spouses",
        };
        println!("connector kind={kind} segments={}", connector.segments.len());
    }
    Ok(())
}
