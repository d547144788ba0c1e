pub mod tag;
pub mod user;

pub use tag::{ReaderTag, ReaderTagType};
pub use user::ReaderUser;
