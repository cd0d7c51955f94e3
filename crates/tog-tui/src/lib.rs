//! Interactive terminal browser core: the view tree, its five concrete
//! views, and the collaborators (screen, color, search) spec §1 and §4
//! describe. `tog-cli` wires this crate to a real terminal and argv.

mod blame_view;
mod color;
mod diff_view;
mod error;
mod log_view;
mod ref_view;
mod screen;
mod search;
mod tree_view;
mod view;

pub use blame_view::BlameView;
pub use color::{ColorConfig, ColorMode, ColorSlot, NamedColor, Style};
pub use diff_view::{DiffSide, DiffView};
pub use error::TuiError;
pub use log_view::LogView;
pub use ref_view::RefView;
pub use screen::{Attr, Region, Screen, TestScreen};
pub use search::{Search, SearchDirection, SearchState};
pub use tree_view::TreeView;
pub use view::{Key, Layout, NumericPrefix, Outcome, ViewId, ViewInputResult, ViewKind, ViewManager, MIN_SPLIT_WIDTH};
