pub mod dates;
pub mod pagination;
