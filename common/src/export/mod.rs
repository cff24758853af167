pub mod excel_core;

pub use excel_core::generate_table_buffer;
