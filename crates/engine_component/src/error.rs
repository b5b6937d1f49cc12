//! Component-layer error types.

use crate::signature::MAX_COMPONENTS;

/// Errors raised while registering component types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComponentError {
    /// Every signature bit is already assigned to a component type.
    #[error("cannot register component `{type_name}`: all {MAX_COMPONENTS} slots are in use")]
    CapacityExceeded {
        /// The component type that did not fit.
        type_name: &'static str,
    },
}
