//! Tree command implementation
//!
//! Renders the component dependency graph as an ASCII tree, or as a
//! DOT digraph for piping into graphviz. Shared dependencies appear
//! once under every component that declares them, the same way cargo
//! renders its own tree.

use std::path::Path;

use anyhow::Result;

use crate::core::graph::DependencyGraph;
use crate::core::project::Project;
use crate::error::OmniforgeError;

/// Execute the tree command
pub async fn execute(project_dir: &Path, target: Option<&str>, dot: bool) -> Result<()> {
    let project = Project::load(project_dir).map_err(OmniforgeError::from)?;
    let graph =
        DependencyGraph::from_components(&project.components).map_err(OmniforgeError::from)?;

    // Resolving validates the target name and rejects cycles before we
    // recurse into the rendering.
    let scope = match target {
        Some(name) => graph.resolve(name).map_err(OmniforgeError::from)?,
        None => {
            graph.resolve_all().map_err(OmniforgeError::from)?;
            graph.nodes().to_vec()
        }
    };

    let output = if dot {
        format_dot(&graph, &scope)
    } else {
        format_tree(&project, &graph, target)
    };
    print!("{output}");
    Ok(())
}

fn format_tree(project: &Project, graph: &DependencyGraph, target: Option<&str>) -> String {
    let roots: Vec<&str> = match target {
        Some(name) => vec![name],
        None => graph.nodes().iter().map(String::as_str).collect(),
    };

    let mut output = format!(
        "{} ({} components)\n",
        project.config.name,
        graph.nodes().len()
    );
    for (position, root) in roots.iter().enumerate() {
        let last = position == roots.len() - 1;
        format_node(project, graph, root, "", last, &mut output);
    }
    output
}

fn format_node(
    project: &Project,
    graph: &DependencyGraph,
    node: &str,
    prefix: &str,
    last: bool,
    output: &mut String,
) {
    let connector = if last { "└── " } else { "├── " };
    output.push_str(&format!("{prefix}{connector}{}\n", describe(project, node)));

    let children = graph.dependencies_of(node);
    let child_prefix = if last {
        format!("{prefix}    ")
    } else {
        format!("{prefix}│   ")
    };
    for (position, child) in children.iter().enumerate() {
        let last_child = position == children.len() - 1;
        format_node(project, graph, child, &child_prefix, last_child, output);
    }
}

/// Node label: the name, plus the platform guard when one applies
fn describe(project: &Project, name: &str) -> String {
    let Some(descriptor) = project.components.iter().find(|c| c.name == name) else {
        return name.to_string();
    };
    match &descriptor.platforms {
        Some(guard) => {
            let selectors: Vec<String> = guard.0.iter().map(ToString::to_string).collect();
            format!("{name} [{}]", selectors.join(", "))
        }
        None => name.to_string(),
    }
}

fn format_dot(graph: &DependencyGraph, scope: &[String]) -> String {
    let mut output = String::new();
    output.push_str("digraph components {\n");
    output.push_str("    rankdir=TB;\n");
    output.push_str("    node [shape=box];\n\n");
    for node in scope {
        output.push_str(&format!("    \"{node}\";\n"));
    }
    output.push('\n');
    for node in scope {
        for dependency in graph.dependencies_of(node) {
            output.push_str(&format!("    \"{node}\" -> \"{dependency}\";\n"));
        }
    }
    output.push_str("}\n");
    output
}
