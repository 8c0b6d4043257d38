// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use crate::{param::*, util::HtmlBuilder};

use bytes::Bytes;
use chrono::prelude::*;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use std::io;

const DEFAULT_CONTENT_TYPE: &str = "text/html;charset=utf-8";

#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    server_name: String,
    date: DateTime<Utc>,
    content_type: String,
    content: Bytes,
    /// 跟在 `Content-length` 之后的额外标头，例如 `Location`
    extra_headers: Vec<(String, String)>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            server_name: SERVER_NAME.to_string(),
            date: Utc::now(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            content: Bytes::new(),
            extra_headers: Vec::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<Bytes>, content_type: &str) -> Self {
        self.content = content.into();
        self.content_type = content_type.to_string();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.extra_headers.push((name.to_string(), value.to_string()));
        self
    }

    /// 带有说明页面的错误响应（400/404/500）
    pub fn from_status(status: StatusCode, note: Option<&str>) -> Self {
        let html = HtmlBuilder::from_status_code(status, note).build();
        Self::new(status).with_content(html, DEFAULT_CONTENT_TYPE)
    }

    pub fn response_400(note: Option<&str>) -> Self {
        Self::from_status(StatusCode::BadRequest, note)
    }

    pub fn response_404() -> Self {
        Self::from_status(StatusCode::NotFound, None)
    }

    pub fn response_500() -> Self {
        Self::from_status(StatusCode::InternalServerError, None)
    }

    /// 302 重定向，`Location` 指向 `target`，正文中附带跳转链接
    pub fn redirect(target: &str) -> Self {
        let html = HtmlBuilder::redirect(target).build();
        Self::new(StatusCode::Found)
            .with_content(html, DEFAULT_CONTENT_TYPE)
            .with_header("Location", target)
    }

    /// 上传成功后的 200 页面
    pub fn upload_success(filename: &str) -> Self {
        let html = HtmlBuilder::upload_success(filename).build();
        Self::new(StatusCode::Ok).with_content(html, DEFAULT_CONTENT_TYPE)
    }

    /// 按固定顺序序列化：状态行、Server、Date、Content-type、Content-length、
    /// 额外标头、空行、正文。
    pub fn as_bytes(&self) -> Vec<u8> {
        let status: &str = &self.status.to_string();
        let server: &str = &self.server_name;
        let date: &str = &format_date(&self.date);
        let content_type: &str = &self.content_type;
        let content_length: &str = &self.content.len().to_string();

        let mut header = [
            HTTP_VERSION,
            " ",
            status,
            CRLF,
            "Server: ",
            server,
            CRLF,
            "Date: ",
            date,
            CRLF,
            "Content-type: ",
            content_type,
            CRLF,
            "Content-length: ",
            content_length,
            CRLF,
        ]
        .concat();
        for (name, value) in &self.extra_headers {
            header.push_str(&[name.as_str(), ": ", value.as_str(), CRLF].concat());
        }
        header.push_str(CRLF);

        let mut bytes = header.into_bytes();
        bytes.extend_from_slice(&self.content);
        bytes
    }

    /// 写出整个响应并刷新
    pub async fn send<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.as_bytes()).await?;
        writer.flush().await
    }
}

impl Response {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn status_code(&self) -> u16 {
        self.status.code()
    }

    pub fn information(&self) -> &str {
        self.status.reason()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.extra_headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
