mod delete;
mod install;

pub use delete::delete;
pub use install::install;
