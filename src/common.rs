pub mod context;
pub mod error;
pub mod locks;
pub mod saga;
