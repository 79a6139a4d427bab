//! Graphviz export of the state transition graph, for debugging.
//!
//! The output format carries no compatibility guarantee.

use std::fmt::Write;

use crate::ecs::storage::Storage;

/// Render every interned state and cached transition as a DOT digraph.
///
/// Nodes are labelled with the state's shape (component names and change flags), its entity
/// flags, and the set realizing it along with that set's live count. Component edges are labelled
/// with the transition and component name, entity edges with the transition alone.
pub fn to_dot(storage: &Storage) -> String {
    let mut out = String::from("digraph states {\n    node [shape=box];\n");
    let components = storage.components();

    for state in storage.states().iter() {
        let shape = state
            .shape()
            .iter()
            .map(|(id, flags)| format!("{}:{flags}", components.name(id)))
            .collect::<Vec<_>>()
            .join(", ");
        let set = match state.set() {
            Some(set) => format!(
                "set {} ({})",
                set.index(),
                storage.sets()[set.index()].len()
            ),
            None => "no set".to_string(),
        };
        let _ = writeln!(
            out,
            "    s{} [label=\"{{{shape}}} [{}]\\n{set}\"];",
            state.id().index(),
            state.flags()
        );
    }

    for state in storage.states().iter() {
        let from = state.id().index();
        for (component, kind, to) in state.component_transitions() {
            let _ = writeln!(
                out,
                "    s{from} -> s{} [label=\"{kind:?} {}\"];",
                to.index(),
                components.name(component)
            );
        }
        for (kind, to) in state.entity_transitions() {
            let _ = writeln!(
                out,
                "    s{from} -> s{} [label=\"{kind:?}\", style=dashed];",
                to.index()
            );
        }
    }

    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use morph_macros::Component;

    use super::*;

    #[derive(Component)]
    struct Position;

    #[test]
    fn renders_states_and_edges() {
        // Given
        let mut storage = Storage::new();
        let entity = storage.create_entity(Position).unwrap();
        storage.destroy_entity(entity).unwrap();

        // When
        let dot = to_dot(&storage);

        // Then
        assert!(dot.starts_with("digraph states {"));
        assert!(dot.trim_end().ends_with('}'));
        assert!(dot.contains("s0 [label=\"{} [C]\\nno set\"];"));
        assert!(dot.contains("s0 -> s1 [label=\"Add Position\"];"));
        assert!(dot.contains("s1 -> s2 [label=\"Destroy\", style=dashed];"));
        assert!(dot.contains("{Position:D} [CX]"));
    }
}
