// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 图片上传模块
//!
//! 上传请求不经过 multipart 解析：请求体里图片前后可能夹杂着边界标记、
//! 表单标头以及多余的 CR/LF，这里只依靠文件格式的起止魔数把真实数据切出来。
//!
//! 处理流程：
//! 1. 按 `Content-Length` 精确读取请求体（[`read_body`]）。
//! 2. 找到 `filename=` 所在行取得文件名，并定位其后的空行（[`parse_form`]）。
//! 3. 用 KMP 在空行之后查找起始、结束标记，截取闭区间（[`extract`]）。
//! 4. 先写临时文件再重命名，保证目标文件要么完整要么不存在（[`store`]）。

use std::path::{Path, PathBuf};

use log::{debug, error, info};
use tokio::{
    fs,
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
};

use crate::{
    exception::Exception,
    filetype::FileTypeRegistry,
    kmp::{self, Pattern},
    param::FILENAME_TOKEN,
};

/// 提取结果：成功时为包含起止标记在内的图片字节，失败时为原因
pub type UploadOutcome<'a> = Result<&'a [u8], Exception>;

/// 从请求体中识别出的上传表单
#[derive(Debug, PartialEq, Eq)]
pub struct UploadForm<'a> {
    pub filename: String,
    /// 文件名所在标头块之后的全部字节，图片就在其中
    pub payload: &'a [u8],
}

/// 按声明的长度精确读取请求体。
///
/// 流提前结束时返回 `TruncatedBody`，而不是用半截数据继续查找标记。
pub async fn read_body<R>(reader: &mut R, declared_len: usize) -> Result<Vec<u8>, Exception>
where
    R: AsyncRead + Unpin,
{
    // 按实际到达的数据增长，避免按客户端声明的长度一次性分配
    let mut body = Vec::with_capacity(declared_len.min(1 << 20));
    (&mut *reader)
        .take(declared_len as u64)
        .read_to_end(&mut body)
        .await?;
    if body.len() < declared_len {
        return Err(Exception::TruncatedBody);
    }
    Ok(body)
}

/// 找到第一处 `filename=`，取该行余下部分作为文件名，并跳过其后的空行。
pub fn parse_form(body: &[u8]) -> Result<UploadForm<'_>, Exception> {
    let token = kmp::find(body, FILENAME_TOKEN)?.ok_or(Exception::MissingFilename)?;
    let value_start = token + FILENAME_TOKEN.len();
    let value_end = body[value_start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(body.len(), |p| value_start + p);

    let raw = String::from_utf8_lossy(&body[value_start..value_end]);
    let filename = raw
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .replace('"', "");
    if filename.is_empty() {
        return Err(Exception::MissingFilename);
    }

    let crlf = Pattern::new(b"\r\n\r\n")?
        .find_from(body, token)
        .map(|i| i + 4);
    let lf = Pattern::new(b"\n\n")?.find_from(body, token).map(|i| i + 2);
    let payload_start = match (crlf, lf) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return Err(Exception::CorruptPayload),
    };

    Ok(UploadForm {
        filename,
        payload: &body[payload_start..],
    })
}

/// 上传文件名只能是单纯的文件名，不能带目录或指向上级
pub fn validate_filename(filename: &str) -> Result<&str, Exception> {
    let bare = Path::new(filename).file_name().and_then(|n| n.to_str()) == Some(filename);
    if !bare || filename.contains(['/', '\\', '\0']) {
        return Err(Exception::InvalidPath);
    }
    Ok(filename)
}

/// 在 `body` 中截取目标文件类型的完整数据。
///
/// 结束标记从起始标记的位置开始查找；起止标记之外的字节全部丢弃。
pub fn extract<'a>(
    body: &'a [u8],
    target_filename: &str,
    registry: &FileTypeRegistry,
) -> UploadOutcome<'a> {
    let file_type = registry.lookup_filename(target_filename)?;

    let start = Pattern::new(file_type.start())?
        .find_in(body)
        .ok_or(Exception::CorruptPayload)?;
    let end = Pattern::new(file_type.end())?
        .find_from(body, start)
        .ok_or(Exception::CorruptPayload)?;

    Ok(&body[start..end + file_type.end().len()])
}

/// 将数据完整写入 `target`。
///
/// 数据先写入同目录下的临时文件，落盘后再重命名覆盖目标；
/// 任何一步失败都会删除临时文件，目标保持原状。
pub async fn store(target: &Path, data: &[u8], id: u128) -> Result<(), Exception> {
    let temp = temp_path(target, id)?;
    let result = async {
        let mut file = fs::File::create(&temp).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp, target).await
    }
    .await;

    if let Err(e) = result {
        error!("[ID{}]写入{}失败：{}", id, target.display(), e);
        let _ = fs::remove_file(&temp).await;
        return Err(Exception::WriteFailed);
    }
    Ok(())
}

fn temp_path(target: &Path, id: u128) -> Result<PathBuf, Exception> {
    let name = target.file_name().ok_or(Exception::InvalidPath)?;
    Ok(target.with_file_name(format!(".{}.{}.part", name.to_string_lossy(), id)))
}

/// 完整处理一次上传：解析表单、校验文件名、提取并保存到 `root` 下。
///
/// 返回保存后的文件名。
pub async fn accept(
    body: &[u8],
    root: &Path,
    registry: &FileTypeRegistry,
    id: u128,
) -> Result<String, Exception> {
    let form = parse_form(body)?;
    let filename = validate_filename(&form.filename)?;
    debug!("[ID{}]上传文件名：{}", id, filename);

    let target = root.join(filename);
    if target.is_dir() {
        return Err(Exception::InvalidPath);
    }

    let data = extract(form.payload, filename, registry)?;
    store(&target, data, id).await?;
    info!("[ID{}]已保存上传文件{}，大小{} bytes", id, filename, data.len());
    Ok(filename.to_string())
}
