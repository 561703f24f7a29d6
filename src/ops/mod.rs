pub mod expiry;
pub mod stack_ops;
