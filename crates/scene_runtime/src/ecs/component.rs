//! Component trait

/// Marker trait for data kept in a [`ComponentStore`](super::ComponentStore)
pub trait Component: 'static {}
