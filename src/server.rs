// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 连接处理
//!
//! 主循环逐个接受连接，每个连接交给独立的 Tokio 任务处理：
//! 读取请求 → 路由 → 返回文件或接收上传 → 写出响应 → 关闭连接。
//!
//! 所有连接只共享一个只读的 [`ServerContext`]（根目录、文件类型注册表、重定向设置），
//! 因此无需任何锁。连接数没有上限，也没有读超时：一个停滞的客户端只会阻塞它自己的任务。

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use log::{debug, error, info, warn};
use tokio::{
    fs,
    io::{self, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpListener,
};

use crate::{
    config::Config,
    exception::Exception,
    filetype::FileTypeRegistry,
    param::StatusCode,
    request::Request,
    response::Response,
    router::{route, Action},
    upload,
    util::probe_content_type,
};

/// 进程级共享的只读状态，启动时构建一次
#[derive(Debug)]
pub struct ServerContext {
    root: PathBuf,
    registry: FileTypeRegistry,
    redirect_path: String,
    redirect_target: String,
}

impl ServerContext {
    /// 根目录会被 canonicalize；不存在或不是目录时返回错误
    pub fn new(config: &Config, registry: FileTypeRegistry) -> Result<Self, Exception> {
        let root = Path::new(config.www_root()).canonicalize()?;
        if !root.is_dir() {
            return Err(Exception::FileNotFound);
        }
        Ok(Self {
            root,
            registry,
            redirect_path: config.redirect_path().to_string(),
            redirect_target: config.redirect_target().to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &FileTypeRegistry {
        &self.registry
    }

    pub fn redirect_path(&self) -> &str {
        &self.redirect_path
    }

    pub fn redirect_target(&self) -> &str {
        &self.redirect_target
    }
}

/// 主事件循环：持续接收新连接并分发到独立任务
pub async fn serve(listener: TcpListener, context: Arc<ServerContext>) {
    let mut id: u128 = 0;
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                error!("接受TCP连接失败：{}", e);
                continue;
            }
        };
        debug!("[ID{}]新的连接：{}", id, addr);

        let context = Arc::clone(&context);
        tokio::spawn(async move {
            handle_connection(stream, id, context).await;
        });
        id += 1;
    }
}

/// # 连接处理器
///
/// 负责单个连接的完整生命周期。无论正常结束、解析失败还是 I/O 出错，
/// 流都会在函数返回时关闭。
pub async fn handle_connection<S>(stream: S, id: u128, context: Arc<ServerContext>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut write_half) = io::split(stream);
    let mut reader = BufReader::new(read_half);
    let start_time = Instant::now();

    // 1. 协议解析：请求行与标头块
    let request = match Request::read_from(&mut reader, id).await {
        Ok(request) => request,
        Err(e) => {
            error!("[ID{}]解析HTTP请求失败，关闭连接: {}", id, e);
            let _ = write_half.shutdown().await;
            return;
        }
    };
    debug!("[ID{}]成功解析HTTP请求", id);

    // 2. 路由与执行
    let response = match respond(&request, &mut reader, &context, id).await {
        Ok(response) => response.with_header("Connection", "close"),
        Err(e) => {
            error!("[ID{}]处理请求时连接出错，关闭连接: {}", id, e);
            let _ = write_half.shutdown().await;
            return;
        }
    };
    debug!(
        "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );

    // 3. 结构化日志记录
    info!(
        "[ID{}] {}, {}, {}, {}, {}, {}",
        id,
        request.version(),
        request.path(),
        request.method(),
        response.status_code(),
        response.information(),
        request.user_agent(),
    );

    // 4. 发送并关闭
    if let Err(e) = response.send(&mut write_half).await {
        error!("[ID{}]发送响应失败: {}", id, e);
    }
    let _ = write_half.shutdown().await;
}

/// 执行路由结果并生成响应。
///
/// 返回 `Err` 仅表示传输层错误，此时连接直接关闭；
/// 返回文件或接收上传过程中的其它错误一律降级为 400。
async fn respond<R>(
    request: &Request,
    reader: &mut R,
    context: &ServerContext,
    id: u128,
) -> Result<Response, Exception>
where
    R: AsyncRead + Unpin,
{
    let response = match route(request, context, id) {
        Action::ServeFile(path) => match serve_file(&path, id).await {
            Ok(response) => response,
            Err(e) => {
                warn!("[ID{}]读取文件{}失败，返回400: {}", id, path.display(), e);
                Response::response_400(None)
            }
        },
        Action::AcceptUpload => match accept_upload(request, reader, context, id).await {
            Ok(filename) => Response::upload_success(&filename),
            Err(e) if e.is_connection_fatal() => return Err(e),
            Err(e) => {
                warn!("[ID{}]上传失败，返回400: {}", id, e);
                Response::response_400(Some(&e.to_string()))
            }
        },
        Action::Redirect(target) => {
            debug!("[ID{}]重定向至{}", id, target);
            Response::redirect(&target)
        }
        Action::NotFound => {
            warn!("[ID{}]请求的路径：{} 不存在，返回404", id, request.path());
            Response::response_404()
        }
        Action::BadRequest => Response::response_400(Some("Invalid path")),
        Action::Unhandled => {
            warn!("[ID{}]无法处理的请求方法：{}，返回500", id, request.method());
            Response::response_500()
        }
    };
    Ok(response)
}

async fn serve_file(path: &Path, id: u128) -> Result<Response, Exception> {
    let content = fs::read(path).await?;
    let mime = probe_content_type(path);
    debug!("[ID{}]MIME类型: {}，大小: {} bytes", id, mime, content.len());
    Ok(Response::new(StatusCode::Ok).with_content(content, &mime))
}

/// 读取请求体并保存其中的图片。
///
/// 读取请求体时的 I/O 错误属于传输错误（`Io`），连接随即关闭；
/// 其余错误（含写盘失败 `WriteFailed`）由调用方转换为 400。
async fn accept_upload<R>(
    request: &Request,
    reader: &mut R,
    context: &ServerContext,
    id: u128,
) -> Result<String, Exception>
where
    R: AsyncRead + Unpin,
{
    let declared_len = request.content_length()?;
    debug!("[ID{}]上传请求体声明长度: {} bytes", id, declared_len);
    let body = upload::read_body(reader, declared_len).await?;

    upload::accept(&body, context.root(), context.registry(), id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filetype::{PNG_END, PNG_START};
    use std::fs as stdfs;
    use tempfile::TempDir;
    use tokio::io::{duplex, AsyncReadExt};

    fn context(dir: &TempDir) -> Arc<ServerContext> {
        let config = Config::new().with_overrides(None, Some(dir.path().display().to_string()));
        Arc::new(ServerContext::new(&config, FileTypeRegistry::default()).unwrap())
    }

    /// 通过内存管道跑一次完整的连接，返回服务端写出的全部字节
    async fn exchange(context: Arc<ServerContext>, raw: &[u8]) -> Vec<u8> {
        let (mut client, server) = duplex(1 << 20);
        let task = tokio::spawn(handle_connection(server, 0, context));
        // 服务端可能在读完之前就关闭连接，写入失败不影响断言
        let _ = client.write_all(raw).await;
        let _ = client.shutdown().await;
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        task.await.unwrap();
        out
    }

    fn status_of(response: &[u8]) -> u16 {
        String::from_utf8_lossy(response)
            .split_whitespace()
            .nth(1)
            .and_then(|c| c.parse().ok())
            .unwrap_or(0)
    }

    fn upload_request(filename: &str, image: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--b\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\r\n",
            filename
        )
        .into_bytes();
        body.extend_from_slice(image);
        body.extend_from_slice(b"\r\n--b--\r\n");

        let mut raw = format!(
            "POST /index.html HTTP/1.1\r\nContent-Length: {}\r\n\r\n",
            body.len()
        )
        .into_bytes();
        raw.extend_from_slice(&body);
        raw
    }

    #[test]
    fn test_context_requires_directory() {
        let config = Config::new().with_overrides(None, Some("/definitely/not/here".to_string()));
        assert!(ServerContext::new(&config, FileTypeRegistry::default()).is_err());
    }

    #[tokio::test]
    async fn test_serves_index() {
        let dir = TempDir::new().unwrap();
        stdfs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();

        let out = exchange(context(&dir), b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await;
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-type: text/html\r\n"));
        assert!(text.contains("Content-length: 13\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.ends_with("\r\n\r\n<h1>home</h1>"));
    }

    #[tokio::test]
    async fn test_missing_index_is_404() {
        let dir = TempDir::new().unwrap();
        let out = exchange(context(&dir), b"GET / HTTP/1.1\r\n\r\n").await;
        assert_eq!(status_of(&out), 404);
    }

    #[tokio::test]
    async fn test_redirect() {
        let dir = TempDir::new().unwrap();
        let out = exchange(context(&dir), b"GET /redirect.html HTTP/1.1\r\n\r\n").await;
        let text = String::from_utf8(out).unwrap();

        assert_eq!(status_of(text.as_bytes()), 302);
        assert!(text.contains("Location: /index.html\r\n"));
        assert!(text.contains(r#"<a href="/index.html">"#));
    }

    #[tokio::test]
    async fn test_malformed_request_closes_silently() {
        let dir = TempDir::new().unwrap();
        let out = exchange(context(&dir), b"GARBAGE\r\n\r\n").await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_unhandled_method_is_500() {
        let dir = TempDir::new().unwrap();
        stdfs::write(dir.path().join("index.html"), "x").unwrap();
        let out = exchange(context(&dir), b"DELETE /index.html HTTP/1.1\r\n\r\n").await;
        assert_eq!(status_of(&out), 500);
    }

    #[tokio::test]
    async fn test_upload_png() {
        let dir = TempDir::new().unwrap();
        stdfs::write(dir.path().join("index.html"), "form").unwrap();
        let mut image = PNG_START.to_vec();
        image.extend_from_slice(b"\r\n\r\npixels\r\n");
        image.extend_from_slice(&PNG_END);

        let out = exchange(context(&dir), &upload_request("cat.png", &image)).await;
        let text = String::from_utf8_lossy(&out).to_string();

        assert_eq!(status_of(&out), 200);
        assert!(text.contains(r#"<a href="/cat.png">cat.png</a>"#));
        assert_eq!(stdfs::read(dir.path().join("cat.png")).unwrap(), image);
    }

    #[tokio::test]
    async fn test_upload_unsupported_type() {
        let dir = TempDir::new().unwrap();
        stdfs::write(dir.path().join("index.html"), "form").unwrap();

        let out = exchange(context(&dir), &upload_request("notes.txt", b"hello")).await;

        assert_eq!(status_of(&out), 400);
        assert!(!dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_upload_truncated_body() {
        let dir = TempDir::new().unwrap();
        stdfs::write(dir.path().join("index.html"), "form").unwrap();
        let mut raw = upload_request("cat.png", &PNG_START);
        // 实际发送的字节比声明的长度少
        raw.truncate(raw.len() - 5);

        let out = exchange(context(&dir), &raw).await;

        assert_eq!(status_of(&out), 400);
        assert!(!dir.path().join("cat.png").exists());
    }

    #[tokio::test]
    async fn test_upload_without_content_length() {
        let dir = TempDir::new().unwrap();
        stdfs::write(dir.path().join("index.html"), "form").unwrap();
        let out = exchange(
            context(&dir),
            b"POST /index.html HTTP/1.1\r\n\r\nfilename=a.png\r\n\r\n",
        )
        .await;
        assert_eq!(status_of(&out), 400);
    }
}
