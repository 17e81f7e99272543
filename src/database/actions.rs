mod follows;
mod ingredients;
mod links;
mod recipes;
mod relations;
mod shopping;
mod users;

pub use follows::*;
pub use ingredients::*;
pub use links::*;
pub use recipes::*;
pub use relations::*;
pub use shopping::*;
pub use users::*;
