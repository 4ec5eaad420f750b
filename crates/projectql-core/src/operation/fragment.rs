//! Fragment resolution: fragment-spread lookups must terminate, so spreads
//! are checked for cycles up front, walking fragment definitions before
//! any field is bound against them.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::ast;

#[derive(Clone, Debug, thiserror::Error)]
pub enum FragmentRegistryError {
    #[error("fragment '{0}' is defined more than once")]
    DuplicateDefinition(String),

    #[error("fragment spread cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("fragment '{0}' is spread but never defined")]
    UndefinedFragment(String),
}

/// All fragment definitions in a document, indexed by name and verified
/// free of spread cycles.
#[derive(Debug, Default)]
pub struct FragmentRegistry {
    definitions: IndexMap<String, ast::operation::FragmentDefinition>,
}

impl FragmentRegistry {
    pub fn get(&self, name: &str) -> Option<&ast::operation::FragmentDefinition> {
        self.definitions.get(name)
    }

    /// Builds a registry from a document's fragment definitions, collecting
    /// every structural problem (duplicates, cycles, dangling spreads)
    /// rather than failing on the first one found.
    pub fn build(document: &ast::operation::Document) -> Result<Self, Vec<FragmentRegistryError>> {
        let mut errors = Vec::new();
        let mut definitions: IndexMap<String, ast::operation::FragmentDefinition> = IndexMap::new();

        for definition in &document.definitions {
            if let ast::operation::Definition::Fragment(frag) = definition {
                if definitions.contains_key(&frag.name) {
                    errors.push(FragmentRegistryError::DuplicateDefinition(frag.name.clone()));
                    continue;
                }
                definitions.insert(frag.name.clone(), frag.clone());
            }
        }

        let adjacency: HashMap<String, Vec<String>> = definitions
            .iter()
            .map(|(name, def)| (name.clone(), spread_names(&def.selection_set)))
            .collect();

        for (name, spreads) in &adjacency {
            for spread in spreads {
                if !definitions.contains_key(spread) {
                    errors.push(FragmentRegistryError::UndefinedFragment(spread.clone()));
                }
            }
            if let Some(cycle) = find_cycle(name, &adjacency) {
                errors.push(FragmentRegistryError::Cycle(cycle));
            }
        }
        dedup_cycle_errors(&mut errors);

        if errors.is_empty() {
            Ok(Self { definitions })
        } else {
            Err(errors)
        }
    }
}

fn spread_names(selection_set: &ast::operation::SelectionSet) -> Vec<String> {
    let mut names = Vec::new();
    for selection in &selection_set.items {
        match selection {
            ast::operation::Selection::FragmentSpread(spread) => names.push(spread.fragment_name.clone()),
            ast::operation::Selection::InlineFragment(inline) => {
                names.extend(spread_names(&inline.selection_set));
            }
            ast::operation::Selection::Field(field) => {
                names.extend(spread_names(&field.selection_set));
            }
        }
    }
    names
}

/// DFS from `start`, returning the first cycle found as a list of fragment
/// names starting from the cycle's re-entry point.
fn find_cycle(start: &str, adjacency: &HashMap<String, Vec<String>>) -> Option<Vec<String>> {
    let mut path: Vec<String> = Vec::new();
    let mut on_path: HashSet<String> = HashSet::new();
    let mut visited: HashSet<String> = HashSet::new();

    fn visit(
        node: &str,
        adjacency: &HashMap<String, Vec<String>>,
        path: &mut Vec<String>,
        on_path: &mut HashSet<String>,
        visited: &mut HashSet<String>,
    ) -> Option<Vec<String>> {
        if on_path.contains(node) {
            let start_idx = path.iter().position(|n| n == node).unwrap_or(0);
            let mut cycle = path[start_idx..].to_vec();
            cycle.push(node.to_string());
            return Some(cycle);
        }
        if visited.contains(node) {
            return None;
        }
        visited.insert(node.to_string());
        path.push(node.to_string());
        on_path.insert(node.to_string());

        if let Some(neighbors) = adjacency.get(node) {
            for neighbor in neighbors {
                if let Some(cycle) = visit(neighbor, adjacency, path, on_path, visited) {
                    return Some(cycle);
                }
            }
        }

        path.pop();
        on_path.remove(node);
        None
    }

    visit(start, adjacency, &mut path, &mut on_path, &mut visited)
}

/// Two DFS starts on the same cycle report the same set of names rotated
/// to a different start; normalize by rotating each cycle to begin at its
/// lexicographically smallest member before deduping.
fn dedup_cycle_errors(errors: &mut Vec<FragmentRegistryError>) {
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    errors.retain(|err| {
        let FragmentRegistryError::Cycle(cycle) = err else {
            return true;
        };
        let body = &cycle[..cycle.len().saturating_sub(1)];
        if body.is_empty() {
            return true;
        }
        let min_idx = (0..body.len()).min_by_key(|&i| &body[i]).unwrap_or(0);
        let normalized: Vec<String> = body[min_idx..].iter().chain(body[..min_idx].iter()).cloned().collect();
        seen.insert(normalized)
    });
}
