//! Nested templates: encode, execute, and unpack into objects.

use graft_tests::prelude::*;
use pretty_assertions::assert_eq;

// ========== TEST: person_with_fields ==========
#[test]
fn test_person_with_fields() {
    // GIVEN {Person: {Name: "Alice", Pet: Dog}}
    init_tracing();
    let mut graph = graph();
    let template = Wish::fields(
        Wish::entity("Person"),
        [("Name", Wish::scalar("Alice")), ("Pet", Wish::entity("Dog"))],
    );

    // WHEN
    let (_, unpacked) = transact_template(&mut graph, template, &TransactConfig::new()).unwrap();

    // THEN the nesting comes back as subject then field values
    let Unpacked::Seq(items) = &unpacked else {
        panic!("expected a sequence, got {unpacked:?}");
    };
    let person = items[0].as_object().unwrap();
    assert_eq!(person.kind, ObjectKind::Entity("Person".into()));

    let Unpacked::Seq(values) = &items[1] else {
        panic!("expected field values, got {:?}", items[1]);
    };
    let name = values[0].as_object().unwrap();
    let pet = values[1].as_object().unwrap();
    assert_eq!(graph.current_value(name.uid), Some(Value::from("Alice")));
    assert_eq!(pet.kind, ObjectKind::Entity("Dog".into()));

    // Person, attribute, dog, and the two field relations
    assert_eq!(graph.live_count(), 5);
}

// ========== TEST: group_of_templates ==========
#[test]
fn test_group_of_templates() {
    // GIVEN a triple and a tag on its source, submitted as one group
    init_tracing();
    let mut graph = graph();
    let template = Wish::group([
        Wish::triple(Wish::entity("Person").named("p"), "Owns", Wish::entity("Dog")),
        Wish::tag(Wish::reference("p"), "owner"),
    ]);

    // WHEN
    let (receipt, unpacked) =
        transact_template(&mut graph, template, &TransactConfig::new()).unwrap();

    // THEN each member unpacks separately
    let Unpacked::Seq(members) = &unpacked else {
        panic!("expected one entry per member, got {unpacked:?}");
    };
    assert_eq!(members.len(), 2);

    let Unpacked::Seq(triple) = &members[0] else {
        panic!("expected a triple, got {:?}", members[0]);
    };
    let source = triple[0].as_object().unwrap();
    let relation = triple[1].as_object().unwrap();
    let target = triple[2].as_object().unwrap();
    assert_eq!(relation.kind.endpoints(), Some((source.uid, target.uid)));

    // the tag position names the tagged object
    assert_eq!(members[1].as_object(), Some(source));
    assert_eq!(graph.tagged("owner").map(|o| o.uid), Some(source.uid));

    // only the user name survives in the receipt
    assert_eq!(receipt.len(), 1);
    assert_eq!(receipt.user("p").map(|o| o.uid), Some(source.uid));
}

// ========== TEST: invalid_template_rejected ==========
#[test]
fn test_invalid_template_rejected() {
    let mut graph = graph();
    let template = Wish::fields(Wish::reference("nobody"), [("Name", Wish::scalar("x"))]);

    let result = transact_template(&mut graph, template, &TransactConfig::new());

    assert!(matches!(result.unwrap_err(), TransactionError::Plan(_)));
    assert_eq!(graph.live_count(), 0);
}
