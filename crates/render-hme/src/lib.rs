//! Human Motion Engine: a deterministic, time-budgeted choreographer that drives
//! the headless browser with cursor moves, micro-hovers, and scrolling that looks
//! human but stays frame-reproducible (§4.E).

pub mod beats;
pub mod cursor;
pub mod path;
pub mod rng;
pub mod safe_click;
pub mod scheduler;
pub mod scroll;

pub use cursor::CursorState;
pub use rng::Mulberry32;
pub use scheduler::run_choreography;
