// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

pub mod config;
pub mod exception;
pub mod filetype;
pub mod kmp;
pub mod param;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod upload;
pub mod util;

pub use exception::Exception;
pub use filetype::{FileType, FileTypeRegistry};
pub use param::{HttpRequestMethod, StatusCode};
pub use request::Request;
pub use response::Response;
pub use server::ServerContext;
pub use util::HtmlBuilder;
