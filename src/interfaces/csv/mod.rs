pub mod allocation_writer;
