// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由引擎
//!
//! 将 (方法, 路径) 映射为要执行的动作，只通过 [`resolve`] 查询文件系统。
//!
//! ## 路由规则（按优先级）
//! 1. 路径解析到文件且方法为 GET：返回该文件。
//! 2. 路径解析到文件且方法为 POST：接收上传。
//! 3. 路径等于配置的重定向触发路径：302 跳转到固定目标。
//! 4. 路径解析不到任何文件：404。
//! 5. 其余情况（路径有效但方法既非 GET 也非 POST）：500。
//!
//! 含 `..` 等越界片段的路径直接以 400 拒绝。

use std::path::PathBuf;

use log::{debug, warn};

use crate::{
    exception::Exception,
    param::{HttpRequestMethod, StatusCode},
    request::Request,
    server::ServerContext,
    util::resolve,
};

/// 路由结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// 返回该文件的内容
    ServeFile(PathBuf),
    /// 读取请求体并保存其中的图片
    AcceptUpload,
    /// 302 跳转到给定目标
    Redirect(String),
    /// 404
    NotFound,
    /// 路径非法，400
    BadRequest,
    /// 路径有效但方法无法处理，500
    Unhandled,
}

impl Action {
    /// 该动作顺利执行时的状态码
    pub fn status(&self) -> StatusCode {
        match self {
            Action::ServeFile(_) | Action::AcceptUpload => StatusCode::Ok,
            Action::Redirect(_) => StatusCode::Found,
            Action::NotFound => StatusCode::NotFound,
            Action::BadRequest => StatusCode::BadRequest,
            Action::Unhandled => StatusCode::InternalServerError,
        }
    }
}

pub fn route(request: &Request, context: &ServerContext, id: u128) -> Action {
    let path = request.path();
    debug!("[ID{}]路由匹配开始: method='{}', path='{}'", id, request.method(), path);

    let item = match resolve(context.root(), path) {
        Ok(item) => item,
        Err(Exception::InvalidPath) => {
            warn!("[ID{}]请求的路径：{} 包含非法片段", id, path);
            return Action::BadRequest;
        }
        Err(e) => {
            warn!("[ID{}]解析路径{}时出错：{}", id, path, e);
            None
        }
    };

    match (item, request.method_kind()) {
        (Some(file), Some(HttpRequestMethod::Get)) => {
            debug!("[ID{}]映射物理路径：{}", id, file.display());
            Action::ServeFile(file)
        }
        (Some(_), Some(HttpRequestMethod::Post)) => Action::AcceptUpload,
        (None, _) if strip_query(path) == context.redirect_path() => {
            Action::Redirect(context.redirect_target().to_string())
        }
        (None, _) => Action::NotFound,
        (Some(_), None) => Action::Unhandled,
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}
