pub mod card;
pub mod index;
pub mod render;
