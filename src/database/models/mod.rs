pub mod course;
pub mod subject;
pub mod user;
pub mod user_course;

pub use course::{BlockType, ContentBlock, Course};
pub use subject::Subject;
pub use user::{Role, User};
pub use user_course::UserCourse;
