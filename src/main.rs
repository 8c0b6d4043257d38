// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 图片上传 Web 服务器
//!
//! 基于 Tokio 运行时的多线程 Web 服务器：
//! - 从根目录提供静态文件，目录请求自动寻找 `index.html` / `index.htm`
//! - 接收 POST 请求体中的原始图片数据，按文件魔数截取后保存到根目录
//! - 固定的重定向路径
//!
//! 用法：`imgserver [<端口> <根目录>]`，省略参数时使用 `config/development.toml`。

use imgserver::{
    config::Config,
    filetype::FileTypeRegistry,
    server::{serve, ServerContext},
};

use log::{error, info, LevelFilter};
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
};
use tokio::{net::TcpListener, runtime::Builder};

use std::{
    env,
    net::{Ipv4Addr, SocketAddrV4},
    process,
    sync::Arc,
};

const LOG_CONFIG: &str = "config/log4rs.yaml";
const SERVER_CONFIG: &str = "config/development.toml";
const USAGE: &str = "Usage: imgserver [<port number> <path to public directory>]";

fn main() {
    // 1. 初始化日志系统：优先使用 YAML 配置，缺失时退回到控制台输出
    init_logger();

    // 2. 环境配置加载：TOML 文件，命令行参数优先
    let args: Vec<String> = env::args().skip(1).collect();
    let (port, root) = match parse_args(&args) {
        Ok(overrides) => overrides,
        Err(message) => {
            eprintln!("{}", message);
            process::exit(1);
        }
    };
    let config = Config::from_toml(SERVER_CONFIG).with_overrides(port, root);
    info!("配置文件已载入");

    // 3. 共享只读状态：根目录与文件类型注册表
    let context = match ServerContext::new(&config, FileTypeRegistry::default()) {
        Ok(context) => Arc::new(context),
        Err(e) => {
            error!("根目录{}不可用：{}", config.www_root(), e);
            eprintln!("The directory \"{}\" does not exist.", config.www_root());
            process::exit(1);
        }
    };
    info!("www root: {}", context.root().display());

    // 4. 异步运行时：按配置分配工作线程数
    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建Tokio运行时：{}", e);
            process::exit(1);
        }
    };

    runtime.block_on(async move {
        // 5. 网络层初始化：全地址监听或本地回环监听
        let address = match config.local() {
            true => Ipv4Addr::new(127, 0, 0, 1),
            false => Ipv4Addr::new(0, 0, 0, 0),
        };
        let socket = SocketAddrV4::new(address, config.port());
        let listener = match TcpListener::bind(socket).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("无法绑定端口：{}，错误：{}", config.port(), e);
                process::exit(1);
            }
        };
        info!("服务端将在{}上监听Socket连接", socket);

        serve(listener, context).await;
    });
}

fn init_logger() {
    if let Err(e) = log4rs::init_file(LOG_CONFIG, Default::default()) {
        eprintln!("无法加载{}：{}，日志将输出到控制台", LOG_CONFIG, e);
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(
                "{d(%Y-%m-%d %H:%M:%S)} {h({l})} - {m}{n}",
            )))
            .build();
        let config = log4rs::Config::builder()
            .appender(Appender::builder().build("stdout", Box::new(stdout)))
            .build(Root::builder().appender("stdout").build(LevelFilter::Info));
        match config {
            Ok(config) => {
                if let Err(e) = log4rs::init_config(config) {
                    eprintln!("无法初始化日志系统：{}", e);
                }
            }
            Err(e) => eprintln!("无法构建日志配置：{}", e),
        }
    }
}

/// 解析 `[<port> <root>]`，两个参数要么都给、要么都不给
fn parse_args(args: &[String]) -> Result<(Option<u16>, Option<String>), String> {
    match args {
        [] => Ok((None, None)),
        [port, root] => {
            let port = port
                .parse::<u16>()
                .map_err(|_| "The port needs to be a number.".to_string())?;
            Ok((Some(port), Some(root.clone())))
        }
        _ => Err(USAGE.to_string()),
    }
}
