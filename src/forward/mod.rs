// Load modules
mod apply_forward;
mod forward_operator;

// Expose functions to public
pub use apply_forward::apply_forward;
pub use forward_operator::ForwardOperator;
