pub mod notification;
pub mod schedule;
pub mod token;

pub use notification::*;
pub use schedule::*;
pub use token::*;
