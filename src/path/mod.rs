//! Path safety for media requests.
//!
//! Every name and folder that arrives in a request passes through this module
//! before it touches the filesystem:
//!
//! - [`make_safe`] strips path separators, dot runs and unsafe characters
//!   from a filename
//! - [`filter_folder`] validates the `folder` parameter as a relative path
//!   without traversal
//! - [`is_safe_relative_path`] is the "sanitize and compare" predicate used
//!   for deletion targets
//! - [`resolve_under`] joins and cleans a path, refusing anything that does not
//!   land strictly inside the base directory

mod resolve;
mod sanitize;

pub use resolve::{clean_path, relative_display, resolve_under};
pub use sanitize::{filter_folder, is_safe_relative_path, make_safe};
