//! 基础规则集注册表
//! 进程内唯一、首次访问时加载、加载后只读（多线程并发读无需加锁）

use std::sync::Arc;

use frame_enhancer_engine::utils::preview_list;
use frame_enhancer_engine::LATEST_VERSION;
use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;

use super::Enhancements;
use crate::error::{EnhancerError, EnhancerResult};

/// 全局注册表实例（加载失败不缓存，下次访问重试）
static GLOBAL_REGISTRY: OnceCell<BaseRegistry> = OnceCell::new();

/// 基础规则集id → 规则集
#[derive(Debug, Default)]
pub struct BaseRegistry {
    bases: FxHashMap<String, Arc<Enhancements>>,
    compact_forms: FxHashMap<String, String>,
}

impl BaseRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// 从 (id, 规则文本) 构建；任一规则集解析失败则整体失败
    /// 基础规则集自身不能再引用其它基础规则集
    pub fn from_configs<I, K, V>(configs: I) -> EnhancerResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut registry = Self::default();
        for (id, text) in configs {
            let id = id.into();
            let enhancements = Self::build_base(&id, text.as_ref())?;
            let compact = enhancements.to_compact_form()?.to_string();
            registry.insert(id, enhancements, compact);
        }
        Ok(registry)
    }

    fn build_base(id: &str, text: &str) -> EnhancerResult<Enhancements> {
        Enhancements::from_rules_text_in(
            &BaseRegistry::empty(),
            text,
            Vec::new(),
            Some(id),
            Some(LATEST_VERSION),
        )
        .map_err(|e| EnhancerError::RegistryInitError(format!("{}: {}", id, e)))
    }

    fn insert(&mut self, id: String, enhancements: Enhancements, compact: String) {
        self.compact_forms.insert(id.clone(), compact);
        self.bases.insert(id, Arc::new(enhancements));
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Enhancements>> {
        self.bases.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.bases.contains_key(id)
    }

    /// 已排序的全部id
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.bases.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// id → 紧凑格式（构建期预先计算）
    pub fn compact_forms(&self) -> &FxHashMap<String, String> {
        &self.compact_forms
    }
}

/// 获取全局注册表（首次调用时加载内置规则集）
pub fn global_registry() -> EnhancerResult<&'static BaseRegistry> {
    GLOBAL_REGISTRY.get_or_try_init(|| {
        let registry = load_builtin_registry()?;
        log::info!(
            "Base registry loaded | bases: {} | ids: {}",
            registry.len(),
            preview_list(&registry.ids(), 8)
        );
        Ok(registry)
    })
}

#[cfg(feature = "embedded-rules")]
fn load_builtin_registry() -> EnhancerResult<BaseRegistry> {
    let mut registry = BaseRegistry::default();
    for config in crate::embedded_configs::load()? {
        let enhancements = BaseRegistry::build_base(&config.id, &config.text)?;
        // 复用构建期结果，避免首次访问时重新编码
        enhancements.prime_compact_form(config.compact.clone());
        log::debug!(
            "Base loaded | id: {} | classifier rules: {} | contributes rules: {}",
            config.id,
            enhancements.effective().classifier_rules().len(),
            enhancements.effective().contributes_rules().len()
        );
        registry.insert(config.id, enhancements, config.compact);
    }
    Ok(registry)
}

#[cfg(not(feature = "embedded-rules"))]
fn load_builtin_registry() -> EnhancerResult<BaseRegistry> {
    log::warn!("Feature `embedded-rules` disabled, base registry is empty");
    Ok(BaseRegistry::empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_from_configs() {
        init_logger();
        let registry = BaseRegistry::from_configs([
            ("base:b", "function:b -app"),
            ("base:a", "function:a -group"),
        ])
        .unwrap();
        assert_eq!(registry.ids(), vec!["base:a", "base:b"]);
        assert_eq!(registry.get("base:a").unwrap().id(), Some("base:a"));
        assert!(registry.compact_forms().contains_key("base:b"));
        assert!(!registry.contains("base:c"));
    }

    #[test]
    fn test_invalid_config_fails_registry() {
        let err = BaseRegistry::from_configs([("broken", "function:a +nonsense")]).unwrap_err();
        assert!(matches!(err, EnhancerError::RegistryInitError(_)));
    }

    #[cfg(feature = "embedded-rules")]
    #[test]
    fn test_builtin_registry() {
        init_logger();
        let registry = global_registry().unwrap();
        assert!(registry.contains(crate::config::DEFAULT_GROUPING_ENHANCEMENTS_ID));
        assert!(registry.contains("common:2019-03-23"));
        assert!(registry.contains("legacy:2019-03-12"));

        // 预计算的紧凑格式与规则集一致
        for (id, compact) in registry.compact_forms() {
            let base = registry.get(id).unwrap();
            let structure = frame_enhancer_engine::decode_compact(compact).unwrap();
            let (_, _, rules) = structure.into_parts().unwrap();
            assert_eq!(&rules.upgrade(), base.effective());
        }
    }
}
