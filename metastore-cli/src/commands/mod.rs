pub mod extract;
pub mod get;
pub mod list;

pub use extract::run_extract;
pub use get::{run_get, GetOutput};
pub use list::run_list;
