pub mod health;
pub mod timelines;
