pub mod x_recent;

pub use x_recent::XRecentSearch;
