// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, warn};
use std::fs::File;
use std::io::prelude::*;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_www_root")]
    www_root: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_local")]
    local: bool,
    #[serde(default = "default_redirect_path")]
    redirect_path: String,
    #[serde(default = "default_redirect_target")]
    redirect_target: String,
}

fn default_www_root() -> String {
    "public".to_string()
}

fn default_port() -> u16 {
    7878
}

fn default_local() -> bool {
    true
}

fn default_redirect_path() -> String {
    "/redirect.html".to_string()
}

fn default_redirect_target() -> String {
    "/index.html".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            www_root: default_www_root(),
            port: default_port(),
            worker_threads: num_cpus::get(),
            local: default_local(),
            redirect_path: default_redirect_path(),
            redirect_target: default_redirect_target(),
        }
    }

    /// 从 TOML 文件读取配置。文件缺失或无法解析时记录错误并使用默认配置。
    pub fn from_toml(filename: &str) -> Self {
        let mut str_val = String::new();
        let read = File::open(filename).and_then(|mut file| file.read_to_string(&mut str_val));
        if let Err(e) = read {
            error!("无法读取配置文件{}：{}，使用默认配置", filename, e);
            return Config::new();
        }
        Self::from_toml_str(&str_val)
    }

    pub fn from_toml_str(content: &str) -> Self {
        let mut raw_config: Config = match toml::from_str(content) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置：{}", e);
                Config::new()
            }
        };
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if !raw_config.redirect_path.starts_with('/') {
            warn!(
                "redirect_path必须以/开头，{}将被改为/{}",
                raw_config.redirect_path, raw_config.redirect_path
            );
            raw_config.redirect_path = format!("/{}", raw_config.redirect_path);
        }
        raw_config
    }

    /// 用命令行参数覆盖端口与根目录
    pub fn with_overrides(mut self, port: Option<u16>, www_root: Option<String>) -> Self {
        if let Some(p) = port {
            self.port = p;
        }
        if let Some(r) = www_root {
            self.www_root = r;
        }
        self
    }
}

impl Config {
    pub fn www_root(&self) -> &str {
        &self.www_root
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn redirect_path(&self) -> &str {
        &self.redirect_path
    }

    pub fn redirect_target(&self) -> &str {
        &self.redirect_target
    }
}
