// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 文件类型注册表
//!
//! 记录每种可上传文件格式的魔数（magic marker）：合法文件一定以起始标记开头、
//! 以结束标记收尾。上传提取器依靠这两段字节在请求体中定位真实的图片数据。

use lazy_static::lazy_static;

use crate::exception::Exception;

/// PNG 文件签名
pub const PNG_START: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
/// PNG 的 IEND 块类型及其 CRC
pub const PNG_END: [u8; 8] = [0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82];
/// JPEG 的 SOI 标记加上第一个段标记的前缀
pub const JPG_START: [u8; 3] = [0xFF, 0xD8, 0xFF];
/// JPEG 的 EOI 标记，后跟上传表单中紧随文件数据的换行。
/// 单独的 `FF D9` 也会出现在内嵌缩略图的末尾，带上换行才能命中真正的文件结尾。
pub const JPG_END: [u8; 4] = [0xFF, 0xD9, 0x0D, 0x0A];

lazy_static! {
    /// 内置的文件类型，进程启动后只读
    static ref BUILTIN_FILE_TYPES: Vec<FileType> = vec![
        FileType::new("PNG", &PNG_START, &PNG_END, &["png"]),
        FileType::new(
            "JPG",
            &JPG_START,
            &JPG_END,
            &["jpg", "jpeg", "jpe", "jif", "jfif", "jfi"],
        ),
    ];
}

/// 一种可上传的文件格式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileType {
    name: String,
    start: Vec<u8>,
    end: Vec<u8>,
    /// 统一以小写、不带点的形式保存
    extensions: Vec<String>,
}

impl FileType {
    pub fn new(name: &str, start: &[u8], end: &[u8], extensions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            start: start.to_vec(),
            end: end.to_vec(),
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> &[u8] {
        &self.start
    }

    pub fn end(&self) -> &[u8] {
        &self.end
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn matches(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }
}

/// 扩展名到文件类型的查找表。
///
/// 在启动阶段构建（可通过 [`FileTypeRegistry::with`] 追加类型），
/// 之后放进 `Arc` 在所有连接间只读共享。
#[derive(Debug, Clone)]
pub struct FileTypeRegistry {
    types: Vec<FileType>,
}

impl Default for FileTypeRegistry {
    fn default() -> Self {
        Self {
            types: BUILTIN_FILE_TYPES.clone(),
        }
    }
}

impl FileTypeRegistry {
    /// 不含任何类型的空表
    pub fn empty() -> Self {
        Self { types: Vec::new() }
    }

    /// 追加一种文件类型。扩展名冲突时先注册者优先。
    pub fn with(mut self, file_type: FileType) -> Self {
        self.types.push(file_type);
        self
    }

    pub fn types(&self) -> &[FileType] {
        &self.types
    }

    /// 根据扩展名查找文件类型，接受 `png` 与 `.png` 两种写法，大小写不敏感
    pub fn lookup(&self, extension: &str) -> Result<&FileType, Exception> {
        let extension = extension.strip_prefix('.').unwrap_or(extension);
        if extension.is_empty() {
            return Err(Exception::UnsupportedFileType);
        }
        self.types
            .iter()
            .find(|t| t.matches(extension))
            .ok_or(Exception::UnsupportedFileType)
    }

    /// 根据文件名的最后一个 `.` 之后的后缀查找文件类型
    pub fn lookup_filename(&self, filename: &str) -> Result<&FileType, Exception> {
        self.lookup(extension_of(filename)?)
    }
}

/// 取文件名最后一个 `.` 之后的部分；没有 `.` 或后缀为空时视为不受支持的类型
pub fn extension_of(filename: &str) -> Result<&str, Exception> {
    match filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Ok(ext),
        _ => Err(Exception::UnsupportedFileType),
    }
}
