pub mod card;
pub mod pipeline;
pub mod server;
