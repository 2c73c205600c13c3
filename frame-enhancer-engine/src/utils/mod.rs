mod preview;

pub use preview::{preview_compact, preview_list};
