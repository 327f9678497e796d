pub mod user;

pub use user::{ListingSource, User, UserListing};
