//! 全局初始化
//! 1. 维护进程生命周期内唯一的配置
//! 2. 应用编译模式缓存容量（必须早于首次规则解析）
//! 3. 预加载基础规则集注册表，内置规则集解析失败则启动失败

use frame_enhancer_engine::{init_pattern_cache, VERSIONS};
use once_cell::sync::OnceCell;

use crate::config::EnhancerConfig;
use crate::enhancements::{global_registry, BaseRegistry};
use crate::error::{EnhancerError, EnhancerResult};

/// 全局配置；未调用 init_enhancer 时首次读取即固定为默认值
static ENHANCER_CONFIG: OnceCell<EnhancerConfig> = OnceCell::new();

/// 当前生效的配置
pub fn enhancer_config() -> &'static EnhancerConfig {
    ENHANCER_CONFIG.get_or_init(EnhancerConfig::default)
}

/// 初始化（幂等：配置已固定时直接返回Ok）
pub fn init_enhancer(config: EnhancerConfig) -> EnhancerResult<()> {
    if let Some(current) = ENHANCER_CONFIG.get() {
        if current != &config {
            log::warn!("Enhancer already initialized, ignoring new configuration");
        }
        return Ok(());
    }

    if !VERSIONS.contains(&config.latest_version) {
        return Err(EnhancerError::UnknownVersion(config.latest_version));
    }
    if !init_pattern_cache(config.pattern_cache_capacity) {
        log::warn!(
            "Pattern cache capacity already fixed, requested capacity {} not applied",
            config.pattern_cache_capacity
        );
    }

    let registry = global_registry()?;
    validate_config(&config, registry)?;

    let default_id = config.default_enhancements_id.clone();
    if ENHANCER_CONFIG.set(config).is_err() {
        log::debug!("Enhancer configuration set concurrently by another thread");
        return Ok(());
    }

    log::info!(
        "Enhancer initialized | bases: {} | default: {}",
        registry.len(),
        default_id
    );
    Ok(())
}

/// 校验配置与注册表是否一致（注册表为空时不校验默认id）
fn validate_config(config: &EnhancerConfig, registry: &BaseRegistry) -> EnhancerResult<()> {
    if !VERSIONS.contains(&config.latest_version) {
        return Err(EnhancerError::UnknownVersion(config.latest_version));
    }
    if !registry.is_empty() && !registry.contains(&config.default_enhancements_id) {
        return Err(EnhancerError::UnknownBase(config.default_enhancements_id.clone()));
    }
    Ok(())
}
