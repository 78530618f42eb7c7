pub mod ffsubsync;
pub mod mpv;
pub mod parser;
