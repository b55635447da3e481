//! XJP Version Manager - 域与镜像版本管理服务
//!
//! Usage:
//! - Normal mode: `xjp-version-manager`
//! - With custom port: `xjp-version-manager --port 19999`

use xjp_version_manager::RuntimeConfig;

/// 解析命令行参数
fn parse_args() -> RuntimeConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RuntimeConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" if i + 1 < args.len() => {
                config.port_override = args[i + 1].parse().ok();
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    config
}

fn print_help() {
    println!("XJP Version Manager - 域与镜像版本管理服务");
    println!();
    println!("USAGE:");
    println!("    xjp-version-manager [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --port <PORT>    Override the listening port");
    println!("    -h, --help       Print help information");
    println!();
    println!("EXAMPLES:");
    println!("    xjp-version-manager                # Normal mode");
    println!("    xjp-version-manager --port 19999   # Custom port");
}

fn main() {
    let config = parse_args();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    rt.block_on(async {
        if let Err(e) = xjp_version_manager::init_and_run(config).await {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    });
}
