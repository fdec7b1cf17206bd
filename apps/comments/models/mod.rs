pub mod comments;
pub mod timeline;

pub mod date_format;
