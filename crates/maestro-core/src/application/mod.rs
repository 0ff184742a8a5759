mod container;
mod implementations;

pub use container::{ApplicationContainer, ExitFuture};
pub use implementations::Application;

#[cfg(test)]
pub use implementations::{MockApplication, MockHandle, MockPreparable};
