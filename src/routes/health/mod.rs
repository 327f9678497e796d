mod handler;

pub use handler::{db_check, root};
