pub mod broadcast;
pub mod events;
pub mod health;
pub mod metrics;
