pub mod assemble;
pub mod filter;
pub mod linked_data;
pub mod sanitize;
