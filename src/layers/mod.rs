pub mod marker;
pub mod reconciler;
