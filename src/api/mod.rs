//! Request and response shapes exchanged over HTTP, plus the entity converters

pub mod courses;
pub mod paging;
pub mod subjects;
pub mod user_courses;
pub mod users;

pub use paging::PageMetadata;
