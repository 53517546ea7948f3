// handlers/public/mod.rs - Endpoints reachable without a token
//
// Route prefix: /api/users (register, login, profile lookup) and /api/subjects
// Middleware: none

pub mod subjects;
pub mod users;
