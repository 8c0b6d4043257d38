// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 负责从 TCP 流中读出请求行与标头块，并解析为 `Request` 结构体：
//! 1. 请求行（Request-Line）按空白切分为方法、路径、版本。
//! 2. 逐行读取标头，直到遇到空行；每行在第一个 `": "` 处切分为名称与值。
//! 3. 读取严格止步于标头块末尾，请求体留在流中，由上传模块按 `Content-Length` 读取。

use std::collections::HashMap;

use log::{debug, error};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::{exception::Exception, param::HttpRequestMethod};

/// 表示一个完整的 HTTP 请求元数据（不含请求体）。
///
/// 解析完成后不再修改，生命周期与所属连接一致。
#[derive(Debug, Clone)]
pub struct Request {
    /// 原样保存的请求方法
    method: String,
    /// 请求的资源路径（包含查询字符串）
    path: String,
    /// 协议版本字符串，例如 `HTTP/1.1`
    version: String,
    /// 标头，键保持收到时的大小写；重复的标头以最后一次为准
    headers: HashMap<String, String>,
}

impl Request {
    /// 从流中读取一个请求的请求行与标头块。
    ///
    /// # 错误处理
    /// - 请求行不足三段：`MalformedRequestLine`
    /// - 标头缺少 `": "`：`MalformedHeader`
    /// - 在空行之前流就结束：`UnexpectedEof`
    /// - 非 UTF-8 字节：`RequestIsNotUtf8`
    pub async fn read_from<R>(reader: &mut R, id: u128) -> Result<Self, Exception>
    where
        R: AsyncBufRead + Unpin,
    {
        // 1. 请求行 (e.g., "GET /index.html HTTP/1.1")
        let request_line = match read_line(reader).await? {
            Some(line) => line,
            None => {
                debug!("[ID{}]客户端未发送任何数据即关闭连接", id);
                return Err(Exception::UnexpectedEof);
            }
        };
        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() < 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, request_line);
            return Err(Exception::MalformedRequestLine);
        }

        let method = parts[0].to_string();
        let version = parts[parts.len() - 1].to_string();
        // 路径中包含空格虽不规范，但通过 join 尝试恢复
        let path = parts[1..parts.len() - 1].join(" ");

        // 2. 标头块，以空行结束
        let mut headers = HashMap::new();
        loop {
            let line = match read_line(reader).await? {
                Some(line) => line,
                None => {
                    error!("[ID{}]标头块尚未结束连接就已关闭", id);
                    return Err(Exception::UnexpectedEof);
                }
            };
            if line.is_empty() {
                break;
            }
            match line.split_once(": ") {
                Some((name, value)) => {
                    headers.insert(name.to_string(), value.to_string());
                }
                None => {
                    error!("[ID{}]HTTP标头格式不正确：{}", id, line);
                    return Err(Exception::MalformedHeader);
                }
            }
        }

        Ok(Self {
            method,
            path,
            version,
            headers,
        })
    }
}

/// 读取一行并去掉行尾的 `\n` 或 `\r\n`。流已结束时返回 `None`。
async fn read_line<R>(reader: &mut R) -> Result<Option<String>, Exception>
where
    R: AsyncBufRead + Unpin,
{
    let mut buffer = Vec::new();
    if reader.read_until(b'\n', &mut buffer).await? == 0 {
        return Ok(None);
    }
    if buffer.last() == Some(&b'\n') {
        buffer.pop();
        if buffer.last() == Some(&b'\r') {
            buffer.pop();
        }
    }
    String::from_utf8(buffer)
        .map(Some)
        .map_err(|_| Exception::RequestIsNotUtf8)
}

// --- Getter 访问器实现 ---

impl Request {
    /// 获取收到的原始方法名
    pub fn method(&self) -> &str {
        &self.method
    }

    /// 大小写不敏感地识别 GET/POST，其它方法为 `None`
    pub fn method_kind(&self) -> Option<HttpRequestMethod> {
        HttpRequestMethod::parse(&self.method)
    }

    /// 获取请求路径（含查询参数）
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 获取 HTTP 协议版本
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// 按收到时的大小写精确查找标头
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// 获取 `User-Agent`，缺失时为空串
    pub fn user_agent(&self) -> &str {
        self.header("User-Agent").unwrap_or("")
    }

    /// 解析 `Content-Length`。
    ///
    /// 先按规范写法精确查找，找不到时再忽略大小写查找。
    pub fn content_length(&self) -> Result<usize, Exception> {
        let value = match self.header("Content-Length") {
            Some(v) => v,
            None => self
                .headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
                .map(|(_, v)| v.as_str())
                .ok_or(Exception::MissingContentLength)?,
        };
        value
            .trim()
            .parse::<usize>()
            .map_err(|_| Exception::MissingContentLength)
    }
}
