pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, info, is_quiet, section, success, warn};
pub use table::{schema_table, snapshot_table};
pub use theme::{theme, Theme};
