// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了服务器在请求处理生命周期中可能产生的各类异常情况。
//!
//! - **协议错误**：请求行或标头格式不正确，连接直接关闭。
//! - **上传错误**：文件类型不受支持、载荷损坏或请求体被截断，对应 `400 Bad Request`。
//! - **文件系统错误**：路径越界或文件不存在。

use std::{fmt, io};

use crate::param::StatusCode;

/// 服务器处理请求过程中发生的异常类型。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 请求行或标头无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 请求行不足三段（方法、路径、版本）。
    MalformedRequestLine,
    /// 标头行缺少 `": "` 分隔符。
    MalformedHeader,
    /// 在读到空行之前连接就结束了。
    UnexpectedEof,
    /// 请求路径包含 `..` 等越权片段，或上传文件名不是单纯的文件名。
    InvalidPath,
    /// 在资源根目录下未找到所请求的文件。
    FileNotFound,
    /// 模式匹配时给出了空的模式串。
    EmptyPattern,
    /// 文件扩展名不在文件类型注册表中。
    UnsupportedFileType,
    /// 请求体中找不到起始或结束标记。
    CorruptPayload,
    /// 实际收到的请求体短于 `Content-Length` 声明的长度。
    TruncatedBody,
    /// 上传请求缺少合法的 `Content-Length`。
    MissingContentLength,
    /// 上传请求体中找不到 `filename=`。
    MissingFilename,
    /// 上传的图片无法写入磁盘。
    WriteFailed,
    /// 底层 I/O 错误。
    Io(io::ErrorKind),
}

use Exception::*;

impl Exception {
    /// 该异常在能够回写响应时对应的状态码。
    ///
    /// 协议错误与传输错误不会产生响应，这里仍给出 400 以便记录日志。
    pub fn status_code(&self) -> StatusCode {
        match self {
            FileNotFound => StatusCode::NotFound,
            _ => StatusCode::BadRequest,
        }
    }

    /// 是否应当直接关闭连接而不回写任何响应
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            RequestIsNotUtf8 | MalformedRequestLine | MalformedHeader | UnexpectedEof | Io(_)
        )
    }
}

impl From<io::Error> for Exception {
    fn from(e: io::Error) -> Self {
        Io(e.kind())
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            MalformedRequestLine => write!(f, "Malformed request line"),
            MalformedHeader => write!(f, "Malformed header line"),
            UnexpectedEof => write!(f, "Stream ended before the header block was complete"),
            InvalidPath => write!(f, "Invalid path (400)"),
            FileNotFound => write!(f, "File not found (404)"),
            EmptyPattern => write!(f, "Empty search pattern"),
            UnsupportedFileType => write!(f, "Unsupported file type"),
            CorruptPayload => write!(f, "Payload markers not found"),
            TruncatedBody => write!(f, "Body shorter than the declared Content-Length"),
            MissingContentLength => write!(f, "Missing or invalid Content-Length"),
            MissingFilename => write!(f, "No filename in upload body"),
            WriteFailed => write!(f, "Couldn't write uploaded file"),
            Io(kind) => write!(f, "I/O error: {}", kind),
        }
    }
}
