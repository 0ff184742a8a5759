mod application;
mod error;
mod preparable;
mod supervisor;
mod utils;
mod watcher;

pub use application::{Application, ApplicationContainer, ExitFuture};
pub use error::{Error, Result};
pub use preparable::{GoPreparable, Preparable};
pub use supervisor::Supervisor;
pub use watcher::Watcher;
