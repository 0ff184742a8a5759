#[cfg(test)]
mod mock;
#[cfg(unix)]
mod unix;

#[cfg(test)]
pub use mock::{MockApplication, MockHandle, MockPreparable};
#[cfg(unix)]
pub use unix::Application;
