pub mod address_space;
pub mod fault;
pub mod frame_allocator;
pub mod main_memory;
pub mod page_table;
pub mod replacement;
