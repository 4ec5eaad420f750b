//! The bound operation: fragment resolution, selection binding, variables
//! and the resulting [`plan::OperationPlan`].

pub mod fragment;
pub mod plan;
pub mod selection;
pub mod variable;

pub use fragment::{FragmentRegistry, FragmentRegistryError};
pub use plan::{OperationKind, OperationPlan};
pub use selection::SelectionNode;
pub use variable::{RequestVariables, VariableDefinition};
