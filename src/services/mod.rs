pub mod composition_service;
pub mod decode_service;
pub mod mix_pipeline;
