/// Router Module Index
///
/// Routes are split by access level so the authentication layer is applied per
/// module rather than per handler.

/// Routes open to anonymous clients (read-only bootcamp access, radius search).
pub mod public;

/// Routes that require a resolved `AuthUser`. Role and ownership checks happen
/// inside the handlers.
pub mod authenticated;
