//! Merge helpers for layered definition documents.

use super::node::Node;

/// Object levels merged key by key: document root, `datasources`, and one
/// data-source entry. Values below that (including `tables`) are replaced
/// whole so an override never interleaves two table orders.
const MERGE_DEPTH: usize = 3;

/// Merge an overlay layer into the accumulated definitions.
pub(super) fn merge_definitions(base: &mut Node, overlay: Node) {
    merge_nodes(base, overlay, MERGE_DEPTH);
}

fn merge_nodes(base: &mut Node, overlay: Node, depth: usize) {
    match (base, overlay) {
        (Node::Object(base_entries), Node::Object(overlay_entries)) if depth > 0 => {
            for (key, value) in overlay_entries {
                match base_entries.iter_mut().find(|(existing, _)| *existing == key) {
                    Some((_, existing)) => merge_nodes(existing, value, depth - 1),
                    None => base_entries.push((key, value)),
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Node {
        json5::from_str(text).expect("parse")
    }

    #[test]
    fn overrides_fields_and_replaces_tables() {
        let mut base = parse(
            "{ datasources: { writer: { host: 'a', port: 1, tables: { x: 'fact', y: 'dimension' } } } }",
        );
        let overlay = parse("{ datasources: { writer: { port: 2, tables: { z: 'z' } } } }");
        merge_definitions(&mut base, overlay);

        let expected = parse(
            "{ datasources: { writer: { host: 'a', port: 2, tables: { z: 'z' } } } }",
        );
        assert_eq!(base, expected);
    }

    #[test]
    fn appends_new_datasources_in_order() {
        let mut base = parse("{ datasources: { writer: { host: 'a' } } }");
        let overlay = parse("{ $schema: 's', datasources: { reader: { host: 'b' } } }");
        merge_definitions(&mut base, overlay);

        let names: Vec<&str> = base
            .get("datasources")
            .and_then(Node::as_object)
            .expect("datasources")
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(names, vec!["writer", "reader"]);
        assert_eq!(base.get("$schema"), Some(&Node::String("s".to_string())));
    }
}
