//! The bound selection tree: AST selections after fragment inlining,
//! directive evaluation and argument binding, but before projection
//! building.

use indexmap::IndexMap;

use crate::host::value::HostValue;

#[derive(Clone, Debug)]
pub struct SelectionNode {
    pub field_name: String,
    pub alias: Option<String>,
    pub arguments: IndexMap<String, HostValue>,
    pub selection_set: Vec<SelectionNode>,
}

impl SelectionNode {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            alias: None,
            arguments: IndexMap::new(),
            selection_set: Vec::new(),
        }
    }

    /// The key this selection contributes under in the result record:
    /// its alias if given, the field name otherwise.
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.field_name)
    }

    pub fn is_leaf(&self) -> bool {
        self.selection_set.is_empty()
    }
}
