pub mod commands;
pub mod doctor;
pub mod error;
pub mod fs_utils;
pub mod paths;
pub mod profiles;
pub mod state;
pub mod status;
pub mod switch;
pub mod tools;
pub mod ui;

#[cfg(test)]
pub mod test_utils;

pub use error::{ErrorKind, ProfileError, Result};
pub use paths::{Paths, ProfileStore};
pub use status::CurrentStatus;
pub use tools::ToolDescriptor;
