pub mod policy;
pub mod router;
pub mod token;
pub mod user;

pub use token::CurrentUser;
