//! Ownership class graph and cycle detection (spec §4.3).
//!
//! Nodes are every declared class and interface. An edge `A -> B` labeled
//! with a field name is added for each field of `A` whose declared type is
//! `share<B>`, directly or nested one level through `Array<share<B>>` /
//! `Map<K, share<B>>`. A cycle in this graph means two or more classes hold
//! `share` references to each other and can never be deterministically
//! freed under reference counting -- diagnostic 301.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};

use vela_ir::{
    ArrayType, ClassNodeId, Decl, Diagnostic, IrType, MapType, MemoryMode, NamedType, Ownership,
    Program, SourceLocation,
};

/// The ownership class graph: one node per class/interface, one edge per
/// `share<C>`-typed field.
pub struct ClassGraph {
    graph: DiGraph<String, String>,
    nodes: HashMap<String, NodeIndex<u32>>,
    locations: HashMap<String, Option<SourceLocation>>,
}

impl ClassGraph {
    pub fn node_id(&self, class_name: &str) -> Option<ClassNodeId> {
        self.nodes.get(class_name).copied().map(ClassNodeId::from)
    }
}

/// Builds the class graph from every `Class`/`Interface` declaration in
/// `program`. Interfaces contribute nodes (they can be named as a field's
/// type) but never contribute edges -- only concrete classes declare fields
/// with storage, so only classes are walked for `share<C>` edges.
pub fn build_class_graph(program: &Program) -> ClassGraph {
    let mut graph = DiGraph::new();
    let mut nodes = HashMap::new();
    let mut locations = HashMap::new();

    for (_, decl) in program.all_decls() {
        let (name, location) = match decl {
            Decl::Class(c) => (c.name.as_str(), c.location.clone()),
            Decl::Interface(i) => (i.name.as_str(), i.location.clone()),
            _ => continue,
        };
        nodes
            .entry(name.to_string())
            .or_insert_with(|| graph.add_node(name.to_string()));
        locations.entry(name.to_string()).or_insert(location);
    }

    for (_, decl) in program.all_decls() {
        let Decl::Class(class) = decl else { continue };
        let from = nodes[&class.name];
        for field in &class.fields {
            for target in shared_class_targets(&field.ty) {
                if let Some(&to) = nodes.get(&target) {
                    graph.add_edge(from, to, field.name.clone());
                }
            }
        }
    }

    ClassGraph {
        graph,
        nodes,
        locations,
    }
}

/// Every class name reachable from `ty` through a `Share`-owned slot:
/// directly, or one level through an array element / map value.
fn shared_class_targets(ty: &IrType) -> Vec<String> {
    let mut out = Vec::new();
    collect_shared_targets(ty, &mut out);
    out
}

fn collect_shared_targets(ty: &IrType, out: &mut Vec<String>) {
    match ty {
        IrType::Named(NamedType {
            name,
            ownership: Ownership::Share,
            ..
        }) => out.push(name.clone()),
        IrType::Array(array) => collect_shared_targets(&array.element, out),
        IrType::Map(map) => collect_shared_targets(&map.value, out),
        IrType::Nullable(inner) | IrType::Promise(inner) => collect_shared_targets(inner, out),
        _ => {}
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Classical three-color DFS cycle detection. White = unvisited, gray = on
/// the current traversal stack, black = fully explored. A back-edge to a
/// gray node closes a cycle; the path is read off the stack from that
/// node's first occurrence. Each edge is visited exactly once over the
/// whole traversal, so this naturally emits one diagnostic per distinct
/// cycle rather than re-reporting the same cycle from every member class.
pub fn find_cycles(graph: &ClassGraph, mode: MemoryMode) -> Vec<Diagnostic> {
    let mut color: HashMap<NodeIndex<u32>, Color> = graph
        .graph
        .node_indices()
        .map(|n| (n, Color::White))
        .collect();
    let mut diagnostics = Vec::new();

    let mut starts: Vec<NodeIndex<u32>> = graph.graph.node_indices().collect();
    starts.sort_by_key(|n| graph.graph[*n].clone());

    for start in starts {
        if color[&start] != Color::White {
            continue;
        }
        let mut stack = Vec::new();
        visit(start, graph, &mut color, &mut stack, mode, &mut diagnostics);
    }

    diagnostics
}

fn visit(
    node: NodeIndex<u32>,
    graph: &ClassGraph,
    color: &mut HashMap<NodeIndex<u32>, Color>,
    stack: &mut Vec<NodeIndex<u32>>,
    mode: MemoryMode,
    diagnostics: &mut Vec<Diagnostic>,
) {
    color.insert(node, Color::Gray);
    stack.push(node);

    let mut neighbors: Vec<NodeIndex<u32>> = graph.graph.neighbors(node).collect();
    neighbors.sort_by_key(|n| graph.graph[*n].clone());

    for next in neighbors {
        match color[&next] {
            Color::White => visit(next, graph, color, stack, mode, diagnostics),
            Color::Gray => diagnostics.push(cycle_diagnostic(graph, stack, next, mode)),
            Color::Black => {}
        }
    }

    stack.pop();
    color.insert(node, Color::Black);
}

fn cycle_diagnostic(
    graph: &ClassGraph,
    stack: &[NodeIndex<u32>],
    back_to: NodeIndex<u32>,
    mode: MemoryMode,
) -> Diagnostic {
    let start = stack.iter().position(|n| *n == back_to).unwrap_or(0);
    let mut path: Vec<String> = stack[start..]
        .iter()
        .map(|n| graph.graph[*n].clone())
        .collect();
    path.push(graph.graph[back_to].clone());

    let message = format!("ownership cycle detected: {}", path.join(" -> "));
    let location = graph
        .locations
        .get(&path[0])
        .cloned()
        .flatten();

    let diagnostic = if mode.is_gc() {
        Diagnostic::warning("301", message)
    } else {
        Diagnostic::error("301", message)
    };
    match location {
        Some(loc) => diagnostic.with_location(loc),
        None => diagnostic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ir::{ClassDecl, ConstructorDecl, FieldDecl, Module, StatementBlock};

    fn class(name: &str, share_field: Option<(&str, &str)>) -> Decl {
        let mut fields = Vec::new();
        if let Some((field_name, target)) = share_field {
            fields.push(FieldDecl {
                name: field_name.to_string(),
                ty: IrType::Named(NamedType::new(target, Ownership::Share)),
                readonly: false,
                initializer: None,
            });
        }
        Decl::Class(ClassDecl {
            name: name.to_string(),
            fields,
            methods: vec![],
            constructor: Some(ConstructorDecl {
                params: vec![],
                body: StatementBlock::empty(),
            }),
            parent: None,
            implements: vec![],
            type_params: vec![],
            location: None,
        })
    }

    #[test]
    fn no_edges_means_no_cycles() {
        let mut module = Module::new("main");
        module.declarations.push(class("A", None));
        let program = Program::new(vec![module]);
        let graph = build_class_graph(&program);
        assert!(find_cycles(&graph, MemoryMode::Ownership).is_empty());
    }

    #[test]
    fn direct_two_class_cycle_is_detected() {
        let mut module = Module::new("main");
        module.declarations.push(class("A", Some(("b", "B"))));
        module.declarations.push(class("B", Some(("a", "A"))));
        let program = Program::new(vec![module]);
        let graph = build_class_graph(&program);
        let diags = find_cycles(&graph, MemoryMode::Ownership);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "301");
        assert_eq!(diags[0].severity, vela_ir::Severity::Error);
    }

    #[test]
    fn cycle_is_a_warning_in_gc_mode() {
        let mut module = Module::new("main");
        module.declarations.push(class("A", Some(("b", "B"))));
        module.declarations.push(class("B", Some(("a", "A"))));
        let program = Program::new(vec![module]);
        let graph = build_class_graph(&program);
        let diags = find_cycles(&graph, MemoryMode::Gc);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, vela_ir::Severity::Warning);
    }

    #[test]
    fn array_of_share_contributes_an_edge() {
        let mut module = Module::new("main");
        let mut a = class("A", None);
        if let Decl::Class(c) = &mut a {
            c.fields.push(FieldDecl {
                name: "items".into(),
                ty: IrType::Array(Box::new(ArrayType {
                    element: IrType::Named(NamedType::new("A", Ownership::Share)),
                    ownership: Ownership::Own,
                })),
                readonly: false,
                initializer: None,
            });
        }
        module.declarations.push(a);
        let program = Program::new(vec![module]);
        let graph = build_class_graph(&program);
        let diags = find_cycles(&graph, MemoryMode::Ownership);
        assert_eq!(diags.len(), 1);
    }
}
