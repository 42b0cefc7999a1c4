pub mod command_log;
pub mod list;
pub mod normalize;
pub mod register;
pub mod replay;
pub mod wipe;
