pub mod color_detector;
pub mod frame;
pub mod hsv_range;
pub mod pid;
pub mod position_controller;
pub mod region;
pub mod state;
pub mod target_selector;
