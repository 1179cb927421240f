pub mod data_loader;
pub mod error;
pub mod image_renderer;
pub mod save_parser;
