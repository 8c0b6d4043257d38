// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::path::{Component, Path, PathBuf};

use crate::{
    exception::Exception,
    param::{StatusCode, INDEX_FILES},
};

/// 生成服务器自带的简单 HTML 页面（错误页、重定向页、上传结果页）
pub struct HtmlBuilder {
    title: String,
    css: String,
    body: String,
}

impl HtmlBuilder {
    fn with_body(title: String, body: String) -> Self {
        let css = r"
            body {
                width: 35em;
                margin: 0 auto;
                font-family: Tahoma, Verdana, Arial, sans-serif;
            }
            "
        .to_string();
        Self { title, css, body }
    }

    pub fn from_status_code(status: StatusCode, note: Option<&str>) -> Self {
        let description = escape_html(note.unwrap_or(status.reason()));
        let body = format!(
            r"
            <h1>{}</h1>
            <p>{}</p>
            ",
            status.code(),
            description
        );
        Self::with_body(status.code().to_string(), body)
    }

    pub fn redirect(target: &str) -> Self {
        let target = escape_html(target);
        let body = format!(
            r#"
            <h1>302</h1>
            <p>The document has moved <a href="{0}">here</a>: {0}</p>
            "#,
            target
        );
        Self::with_body("302".to_string(), body)
    }

    pub fn upload_success(filename: &str) -> Self {
        let name = escape_html(filename);
        let body = format!(
            r#"
            <p>You will find your image at: <a href="/{0}">{0}</a></p>
            "#,
            name
        );
        Self::with_body("Upload complete".to_string(), body)
    }

    pub fn build(&self) -> String {
        format!(
            r##"<!DOCTYPE html>
            <!-- 本文件由shaneyale的Rust Webserver自动生成 -->
            <html>
                <head>
                    <meta charset="utf-8">
                    <title>{}</title>
                    <style>{}</style>
                </head>
                <body>
                {}
                </body>
            </html>"##,
            self.title, self.css, self.body
        )
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 将请求路径解析为根目录下可供下载的文件。
///
/// - 查询字符串与片段被忽略。
/// - 含有 `..` 或其它非普通路径片段时返回 `InvalidPath`。
/// - 目录依次尝试 `index.html`、`index.htm`，都不存在则视为不存在。
/// - 解析结果经 canonicalize 后必须仍位于 `root` 之下（防止符号链接越界）。
///
/// `root` 须为已 canonicalize 的绝对路径。
pub fn resolve(root: &Path, request_path: &str) -> Result<Option<PathBuf>, Exception> {
    let path = request_path.split(['?', '#']).next().unwrap_or("");
    let mut full_path = root.to_path_buf();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(Exception::InvalidPath),
            s => {
                let normal = Path::new(s)
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)));
                if !normal || s.contains(['\\', '\0']) {
                    return Err(Exception::InvalidPath);
                }
                full_path.push(s);
            }
        }
    }

    let candidate = if full_path.is_dir() {
        match INDEX_FILES
            .iter()
            .map(|index| full_path.join(index))
            .find(|p| p.is_file())
        {
            Some(index) => index,
            None => return Ok(None),
        }
    } else if full_path.is_file() {
        full_path
    } else {
        return Ok(None);
    };

    let canonical = candidate.canonicalize()?;
    if !canonical.starts_with(root) {
        return Err(Exception::InvalidPath);
    }
    Ok(Some(canonical))
}

/// 根据扩展名推断 MIME 类型，无法识别时为 `application/octet-stream`
pub fn probe_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        (dir, root)
    }

    #[test]
    fn test_resolve_plain_file() {
        let (_dir, root) = site();
        fs::write(root.join("a.txt"), "a").unwrap();

        assert_eq!(resolve(&root, "/a.txt").unwrap(), Some(root.join("a.txt")));
        assert_eq!(resolve(&root, "/a.txt?x=1").unwrap(), Some(root.join("a.txt")));
        assert_eq!(resolve(&root, "/missing.txt").unwrap(), None);
    }

    #[test]
    fn test_resolve_root_index() {
        let (_dir, root) = site();
        assert_eq!(resolve(&root, "/").unwrap(), None);

        fs::write(root.join("index.htm"), "htm").unwrap();
        assert_eq!(resolve(&root, "/").unwrap(), Some(root.join("index.htm")));

        fs::write(root.join("index.html"), "html").unwrap();
        assert_eq!(resolve(&root, "/").unwrap(), Some(root.join("index.html")));
    }

    #[test]
    fn test_resolve_subdirectory_index() {
        let (_dir, root) = site();
        fs::create_dir(root.join("docs")).unwrap();
        assert_eq!(resolve(&root, "/docs/").unwrap(), None);

        fs::write(root.join("docs").join("index.html"), "docs").unwrap();
        assert_eq!(
            resolve(&root, "/docs").unwrap(),
            Some(root.join("docs").join("index.html"))
        );
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let (_dir, root) = site();
        fs::create_dir(root.join("docs")).unwrap();

        assert_eq!(resolve(&root, "/../etc/passwd"), Err(Exception::InvalidPath));
        assert_eq!(resolve(&root, "/docs/../../x"), Err(Exception::InvalidPath));
        assert_eq!(resolve(&root, "/docs/.."), Err(Exception::InvalidPath));
        assert_eq!(resolve(&root, "/..\\secret"), Err(Exception::InvalidPath));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_escape() {
        let (_dir, root) = site();
        let (_outside_dir, outside) = site();
        fs::write(outside.join("secret.txt"), "secret").unwrap();
        std::os::unix::fs::symlink(outside.join("secret.txt"), root.join("link.txt")).unwrap();

        assert_eq!(resolve(&root, "/link.txt"), Err(Exception::InvalidPath));
    }

    #[test]
    fn test_probe_content_type() {
        assert_eq!(probe_content_type(Path::new("a.html")), "text/html");
        assert_eq!(probe_content_type(Path::new("a.png")), "image/png");
        assert_eq!(probe_content_type(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(
            probe_content_type(Path::new("a.unknownext")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_html_builder_from_status_code() {
        let html = HtmlBuilder::from_status_code(StatusCode::NotFound, None).build();
        assert!(html.contains("<h1>404</h1>"));
        assert!(html.contains("Not Found"));

        let html = HtmlBuilder::from_status_code(StatusCode::BadRequest, Some("bad <png>")).build();
        assert!(html.contains("bad &lt;png&gt;"));
    }

    #[test]
    fn test_html_builder_redirect() {
        let html = HtmlBuilder::redirect("/index.html").build();
        assert!(html.contains(r#"<a href="/index.html">"#));
    }

    #[test]
    fn test_html_builder_upload_success() {
        let html = HtmlBuilder::upload_success("cat.png").build();
        assert!(html.contains(r#"You will find your image at: <a href="/cat.png">cat.png</a>"#));
    }
}
