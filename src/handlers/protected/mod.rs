// handlers/protected/mod.rs - Endpoints for any authenticated principal
//
// Middleware: authenticate (401 without a valid token)
// Handlers receive the principal through the `AuthUser` extractor.

pub mod courses;
pub mod users;
