pub mod dataset;
pub mod tile_retriever;
