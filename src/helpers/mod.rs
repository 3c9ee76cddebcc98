pub(crate) mod combine;
pub(crate) mod flatten;
pub(crate) mod keyed;
pub(crate) mod stdlib;

// Only re-export files with top-level functions
pub use stdlib::*;
