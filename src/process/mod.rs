pub mod child;
pub mod status;

pub use self::{child::Child, status::ExitStatus};
