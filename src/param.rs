// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Web 服务器协议参数与常量模块
//!
//! 该模块定义了服务器遵循的 HTTP 协议相关常量和数据结构，包括：
//! - 服务器对外暴露的固定状态码及其原因短语（Reason Phrase）。
//! - HTTP 方法的强类型枚举。
//! - 目录索引文件名等路由相关常量。

use std::fmt;

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "shaneyale-imgserver";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 响应行使用的协议版本
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// 请求目录时依次尝试的索引文件
pub const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];

/// 上传请求体中标记文件名的记号
pub const FILENAME_TOKEN: &[u8] = b"filename=";

/// 服务器对外暴露的全部状态码。
///
/// 集合是封闭的：路由与错误处理只会产生这五种结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200，请求成功
    Ok,
    /// 302，临时重定向
    Found,
    /// 400，请求格式或上传内容有误
    BadRequest,
    /// 404，资源不存在
    NotFound,
    /// 500，路径合法但无法处理该方法
    InternalServerError,
}

impl StatusCode {
    pub fn code(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Found => 302,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Found => "Found",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

impl fmt::Display for StatusCode {
    /// 格式化为状态行中的 `<code> <reason>` 部分
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// 服务器能够处理的 HTTP 请求方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpRequestMethod {
    /// 获取资源
    Get,
    /// 上传图片
    Post,
}

impl HttpRequestMethod {
    /// 大小写不敏感地识别方法名，其它方法返回 `None`
    pub fn parse(method: &str) -> Option<Self> {
        if method.eq_ignore_ascii_case("GET") {
            Some(HttpRequestMethod::Get)
        } else if method.eq_ignore_ascii_case("POST") {
            Some(HttpRequestMethod::Post)
        } else {
            None
        }
    }
}

impl fmt::Display for HttpRequestMethod {
    /// 将枚举格式化为 HTTP 标准大写方法名
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpRequestMethod::Get => write!(f, "GET"),
            HttpRequestMethod::Post => write!(f, "POST"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_text() {
        assert_eq!(StatusCode::Ok.to_string(), "200 OK");
        assert_eq!(StatusCode::Found.to_string(), "302 Found");
        assert_eq!(StatusCode::BadRequest.to_string(), "400 Bad Request");
        assert_eq!(StatusCode::NotFound.to_string(), "404 Not Found");
        assert_eq!(
            StatusCode::InternalServerError.to_string(),
            "500 Internal Server Error"
        );
    }

    #[test]
    fn test_method_case_insensitive() {
        assert_eq!(HttpRequestMethod::parse("get"), Some(HttpRequestMethod::Get));
        assert_eq!(HttpRequestMethod::parse("PoSt"), Some(HttpRequestMethod::Post));
        assert_eq!(HttpRequestMethod::parse("DELETE"), None);
        assert_eq!(HttpRequestMethod::parse("HEAD"), None);
    }
}
