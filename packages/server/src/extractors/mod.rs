pub mod response_mode;
