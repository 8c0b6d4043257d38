// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 字节序列匹配模块
//!
//! 基于 Knuth-Morris-Pratt 算法在字节缓冲区中查找模式串。
//! 上传的图片可能有数 MB，逐字节移位比较的 O(n·m) 做法不可接受，
//! 这里预先计算模式串的失配表（failure function），整体复杂度为 O(n + m)。

use crate::exception::Exception;

/// 预先计算好失配表的模式串，可在多个缓冲区或多个起点上重复查找。
#[derive(Debug, Clone)]
pub struct Pattern<'a> {
    needle: &'a [u8],
    /// `failure[i]` 为 `needle[..=i]` 的最长真前缀兼后缀的长度
    failure: Vec<usize>,
}

impl<'a> Pattern<'a> {
    /// 构造模式串。空模式串没有意义，返回 `EmptyPattern`。
    pub fn new(needle: &'a [u8]) -> Result<Self, Exception> {
        if needle.is_empty() {
            return Err(Exception::EmptyPattern);
        }
        Ok(Self {
            needle,
            failure: failure_table(needle),
        })
    }

    pub fn len(&self) -> usize {
        self.needle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    /// 返回模式串在 `haystack` 中第一次出现的起始下标
    pub fn find_in(&self, haystack: &[u8]) -> Option<usize> {
        self.find_from(haystack, 0)
    }

    /// 从 `start` 处（含）开始查找，返回值仍是相对 `haystack` 开头的下标
    pub fn find_from(&self, haystack: &[u8], start: usize) -> Option<usize> {
        if start >= haystack.len() || haystack.len() - start < self.needle.len() {
            return None;
        }
        let mut matched = 0;
        for (i, &byte) in haystack.iter().enumerate().skip(start) {
            while matched > 0 && byte != self.needle[matched] {
                matched = self.failure[matched - 1];
            }
            if byte == self.needle[matched] {
                matched += 1;
            }
            if matched == self.needle.len() {
                return Some(i + 1 - matched);
            }
        }
        None
    }
}

/// 一次性查找：返回 `needle` 在 `haystack` 中最小的出现下标。
///
/// 找不到时返回 `Ok(None)`，`needle` 为空时返回 `Err(EmptyPattern)`。
pub fn find(haystack: &[u8], needle: &[u8]) -> Result<Option<usize>, Exception> {
    Ok(Pattern::new(needle)?.find_in(haystack))
}

fn failure_table(needle: &[u8]) -> Vec<usize> {
    let mut table = vec![0; needle.len()];
    let mut k = 0;
    for i in 1..needle.len() {
        while k > 0 && needle[i] != needle[k] {
            k = table[k - 1];
        }
        if needle[i] == needle[k] {
            k += 1;
        }
        table[i] = k;
    }
    table
}
