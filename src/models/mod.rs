pub mod product;
pub mod sale;
pub mod contract;
pub mod cart;
pub mod notification;
