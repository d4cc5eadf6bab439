mod controller;
mod session;

pub use controller::PlaybackController;
pub use session::{
    PlaybackSession, MAX_PITCH_CENTS, MAX_POSITION_JUMP_SECS, MAX_RATE, MIN_PITCH_CENTS, MIN_RATE,
};
