pub mod rows;
pub mod stub_api;
