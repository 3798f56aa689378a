pub mod auto_data;
