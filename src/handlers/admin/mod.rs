// handlers/admin/mod.rs - Administrative endpoints
//
// Route prefix: /api/admin
// Middleware: authenticate, then require_role(Role::Admin)
// A missing token is rejected with 401 before the role gate answers 403.

pub mod courses;
pub mod subjects;
pub mod user_courses;
pub mod users;
