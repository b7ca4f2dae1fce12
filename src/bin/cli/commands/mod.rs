pub mod card;
pub mod pipeline;
pub mod transfer;
pub mod user;
