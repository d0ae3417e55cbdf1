pub mod links;
pub mod menu;
