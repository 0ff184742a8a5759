mod background;
mod master;

pub use master::Supervisor;
