//! Fixed text bodies served by the web surface and the error path.

pub const HOMEPAGE: &str = include_str!("../../data/homepage.txt");
pub const NOT_FOUND: &str = include_str!("../../data/404.txt");
pub const SERVER_ERROR: &str = include_str!("../../data/error.txt");

/// Path suffix that selects the printer description document.
pub const PPD_SUFFIX: &str = ".ppd";
