// SPDX-License-Identifier: GPL-3.0-or-later

pub mod constants;
pub mod infrastructure;

// These are marked as allow unused since some modules may not use all items
#[allow(unused_imports)]
pub use constants::*;
#[allow(unused_imports)]
pub use infrastructure::*;
