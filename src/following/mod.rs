pub mod sleep_controller;
pub mod direction_lock;
pub mod state_machine;
pub mod position_follower;
pub mod warning_latch;
