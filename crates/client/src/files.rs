// 命令行使用的文件格式：私钥为十六进制文本，其余为二进制

use anyhow::{bail, Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use zeroize::Zeroizing;

pub fn read_hex_secret(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    let text = Zeroizing::new(
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read key file {}", path.display()))?,
    );
    let bytes = hex::decode(text.trim())
        .with_context(|| format!("key file {} is not valid hex", path.display()))?;
    Ok(Zeroizing::new(bytes))
}

/// 写入私钥文件，拒绝覆盖已有文件
pub fn write_hex_secret(path: &Path, secret: &[u8]) -> Result<()> {
    let text = Zeroizing::new(hex::encode(secret));
    write_new(path, format!("{}\n", text.as_str()).as_bytes())
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

pub fn write_new(path: &Path, bytes: &[u8]) -> Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(bytes)?;
    Ok(())
}
