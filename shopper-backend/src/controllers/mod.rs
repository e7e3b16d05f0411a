pub mod chat;
pub mod delegations;
pub mod health;
