//! Property tests for the XML tree, its serializer and the sanitize gate.

use pptslim::xml::{self, SerializeOptions, XmlElement, XmlNode};
use pptslim::{OptimizeOptions, Optimizer, Package};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;

fn name() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-zA-Z0-9]{0,6}",
        "[a-z][a-zA-Z0-9]{0,6}".prop_map(|local| format!("p:{local}")),
    ]
}

fn attributes() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::btree_map("[a-z]{1,6}", "[a-zA-Z0-9 <>&\"'é中]{0,12}", 0..4)
        .prop_map(|map: BTreeMap<String, String>| map.into_iter().collect())
}

fn text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 \n\t<>&\"'é中]{1,16}"
}

/// Adjacent text nodes read back as one; build trees the way they parse.
fn merge_text(children: Vec<XmlNode>) -> Vec<XmlNode> {
    let mut merged: Vec<XmlNode> = Vec::new();
    for child in children {
        match (merged.last_mut(), child) {
            (Some(XmlNode::Text(prev)), XmlNode::Text(next)) => prev.push_str(&next),
            (_, child) => merged.push(child),
        }
    }
    merged
}

fn element() -> impl Strategy<Value = XmlElement> {
    let leaf = (name(), attributes()).prop_map(|(name, attributes)| XmlElement {
        name,
        attributes,
        children: Vec::new(),
    });
    leaf.prop_recursive(4, 48, 4, |inner| {
        (
            name(),
            attributes(),
            prop::collection::vec(
                prop_oneof![inner.prop_map(XmlNode::Element), text().prop_map(XmlNode::Text)],
                0..4,
            ),
        )
            .prop_map(|(name, attributes, children)| XmlElement {
                name,
                attributes,
                children: merge_text(children),
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        rng_seed: proptest::test_runner::RngSeed::Fixed(0),
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn serialized_tree_parses_back(root in element()) {
        let text = xml::serialize(&root, &SerializeOptions::default()).unwrap();
        let parsed = xml::parse(&text).unwrap();
        prop_assert!(parsed.structurally_eq(&root), "{text}");
    }

    #[test]
    fn rebuild_passes_validation_and_keeps_structure(root in element()) {
        let text = xml::rebuild(&root, &SerializeOptions::default()).unwrap();
        prop_assert!(xml::validate(&text).is_ok());
        prop_assert!(text.starts_with(xml::XML_DECLARATION));
        let parsed = xml::parse(&text).unwrap();
        prop_assert!(parsed.structurally_eq(&root), "{text}");
    }

    #[test]
    fn sanitize_is_idempotent(root in element()) {
        let text = xml::serialize(&root, &SerializeOptions::default()).unwrap();
        let once = xml::sanitize(&text);
        prop_assert_eq!(xml::sanitize(&once), once.clone());
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let loaded = std::panic::catch_unwind(|| Package::from_bytes(&bytes).is_ok());
        prop_assert!(loaded.is_ok(), "Package::from_bytes panicked");

        let optimizer = Optimizer::new(OptimizeOptions::default());
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| optimizer.optimize(&bytes).is_ok()));
        prop_assert!(outcome.is_ok(), "optimize panicked");
    }
}

#[test]
fn namespaces_are_injected_once() {
    let root = XmlElement::new("p:presentation").with_attribute(
        "xmlns:p",
        "http://schemas.openxmlformats.org/presentationml/2006/main",
    );
    let text = xml::serialize(&root, &SerializeOptions::presentation()).unwrap();
    assert_eq!(text.matches("xmlns:p=").count(), 1);
    assert!(text.contains("xmlns:a="));
    assert!(text.contains("xmlns:r="));
}
