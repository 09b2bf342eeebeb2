mod access;
mod unlock_pass;

pub use access::*;
pub use unlock_pass::*;
