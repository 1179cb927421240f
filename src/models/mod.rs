pub mod card;
pub mod deck;
pub mod ordered;
pub mod save;

pub use card::*;
pub use deck::*;
pub use ordered::Ordered;
pub use save::*;
