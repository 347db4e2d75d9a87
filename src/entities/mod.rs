pub mod cart_item;
pub mod category;
pub mod order;
pub mod order_item;
pub mod product;
pub mod user;

pub use user::Role;
