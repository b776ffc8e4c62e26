mod event;
mod match_record;
mod minute;
mod player;
mod score;
mod stats;
mod team;

pub use event::*;
pub use match_record::*;
pub use minute::*;
pub use player::*;
pub use score::*;
pub use stats::*;
pub use team::*;
