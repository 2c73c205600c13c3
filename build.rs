// build.rs
// 1. 遍历 enhancement-configs/ 下的内置规则文件（*.txt）
// 2. 用引擎解析器校验每个文件，语法错误直接让构建失败
// 3. 预先计算每个规则集的紧凑格式
// 4. JSON序列化 + LZ4压缩后写入OUT_DIR，供lib.rs通过include_bytes!固化
use frame_enhancer_engine::{
    encode_compact, parse_enhancements, ConfigStructure, RuleSet, RuleSetVariant, LATEST_VERSION,
};
use serde::Serialize;
use std::error::Error;
use std::{fs, path::Path};
use walkdir::WalkDir;

const CONFIGS_DIR: &str = "enhancement-configs";
const BUNDLE_FILENAME: &str = "enhancement_configs.json.lz4";

/// 内置规则集条目（字段需与运行时反序列化结构一致）
#[derive(Debug, Serialize)]
struct BundledConfig {
    id: String,
    text: String,
    compact: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    // 未开启嵌入式规则feature时不执行构建逻辑
    if std::env::var("CARGO_FEATURE_EMBEDDED_RULES").is_err() {
        return Ok(());
    }

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed={}/", CONFIGS_DIR);

    let mut configs = Vec::new();
    for entry in WalkDir::new(CONFIGS_DIR).min_depth(1).max_depth(1) {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        println!("cargo:rerun-if-changed={}", path.display());

        // Windows 文件名不能含 `:`，文件名中用 `@` 代替
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| format!("invalid config filename: {}", path.display()))?
            .replace('@', ":");

        let text = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        let rules = parse_enhancements(&text)
            .map_err(|e| format!("invalid enhancements config {}: {}", path.display(), e))?;

        let structure = ConfigStructure::from_variant(
            LATEST_VERSION,
            &[],
            &RuleSetVariant::Split(RuleSet::from_rules(rules)),
        );
        let compact = encode_compact(&structure)
            .map_err(|e| format!("failed to encode {}: {}", path.display(), e))?;

        configs.push(BundledConfig { id, text, compact });
    }
    // 保证产物与文件系统遍历顺序无关
    configs.sort_by(|a, b| a.id.cmp(&b.id));

    let bundle_json =
        serde_json::to_vec(&configs).map_err(|e| format!("failed to serialize configs: {}", e))?;
    let bundle = lz4_flex::compress_prepend_size(&bundle_json);

    let out_dir = std::env::var("OUT_DIR")?;
    let out_path = Path::new(&out_dir).join(BUNDLE_FILENAME);
    fs::write(&out_path, &bundle)
        .map_err(|e| format!("failed to write {}: {}", out_path.display(), e))?;

    println!("cargo:rustc-env=ENHANCEMENT_CONFIGS_FILENAME={}", BUNDLE_FILENAME);
    Ok(())
}
