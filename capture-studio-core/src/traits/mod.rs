pub mod chunk_buffer;
pub mod media_devices;
pub mod media_track;
pub mod persistence;
pub mod recorder_backend;
pub mod studio_delegate;
