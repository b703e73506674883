//! Without the `logging` feature nothing is written, but `log::max_level()`
//! still follows the most verbose level requested so callers can check it.

use crate::log::LogState;

impl LogState {
    pub(super) fn install(&mut self) {
        let most_verbose = self.filters.values().copied().fold(self.level, Ord::max);
        log::set_max_level(most_verbose);
    }
}
