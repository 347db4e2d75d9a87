// Core commerce services
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;

// Accounts and reporting
pub mod dashboard;
pub mod users;
