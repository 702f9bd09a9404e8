pub mod canvas_track;
pub mod color;
pub mod compositor;
pub mod drag;
pub mod geometry;
pub mod heartbeat;
pub mod mode_selector;
