pub mod card_pipeline;
pub mod deck_locator;
pub mod deck_reconciler;
pub mod drive_uploader;

// 重新导出主要的结构体，以便可以直接从 services 模块导入
pub use card_pipeline::CardPipeline;
