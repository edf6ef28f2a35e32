pub mod audit;
pub mod codes;
pub mod db;
pub mod error;
pub mod hierarchy;
pub mod model;
pub mod schemas;
pub mod store;
pub mod time;
pub mod weights;
