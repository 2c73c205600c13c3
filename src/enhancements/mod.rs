//! 规则集（Enhancements）
//! 负责：基础规则集合并、分类结果写回帧记录、按分组变体组装堆栈组件、紧凑格式缓存

mod registry;
mod summary;

use std::sync::Arc;

use frame_enhancer_engine::{
    decode_compact, encode_compact, parse_enhancements, Component, ConfigStructure, ExceptionData,
    MatchFrame, RuleSet, RuleSetVariant, VERSIONS,
};
use once_cell::sync::OnceCell;

pub use registry::{global_registry, BaseRegistry};
pub use summary::{EnhancementRuleDict, EnhancementsDict};

use crate::error::{EnhancerError, EnhancerResult};
use crate::frame::Frame;
use crate::global::enhancer_config;
use crate::grouping::{
    FrameCounts, FrameGroupingComponent, GroupingVariant, StacktraceGroupingComponent,
};

/// 一组堆栈规则及其基础规则集
/// 构造完成后只读，可在线程间共享
#[derive(Debug)]
pub struct Enhancements {
    id: Option<String>,
    version: u32,
    bases: Vec<String>,
    /// 自身规则（按版本保存原始形态）
    rules: RuleSetVariant,
    /// 求值形态：各基础规则集的规则在前，自身规则在后
    effective: RuleSet,
    compact: OnceCell<String>,
}

impl Enhancements {
    /// 从规则文本构建，基础规则集从全局注册表解析
    pub fn from_rules_text(
        text: &str,
        bases: Vec<String>,
        id: Option<&str>,
        version: Option<u32>,
    ) -> EnhancerResult<Self> {
        Self::from_rules_text_in(global_registry()?, text, bases, id, version)
    }

    /// 从规则文本构建，基础规则集从指定注册表解析
    pub fn from_rules_text_in(
        registry: &BaseRegistry,
        text: &str,
        bases: Vec<String>,
        id: Option<&str>,
        version: Option<u32>,
    ) -> EnhancerResult<Self> {
        let version = version.unwrap_or_else(|| enhancer_config().latest_version);
        if !VERSIONS.contains(&version) {
            return Err(EnhancerError::UnknownVersion(version));
        }

        let rules = parse_enhancements(text)?;
        let rules = if version <= 2 {
            RuleSetVariant::Legacy(rules.into_iter().map(Arc::new).collect())
        } else {
            RuleSetVariant::Split(RuleSet::from_rules(rules))
        };
        Self::build(registry, id.map(str::to_string), version, bases, rules)
    }

    /// 从紧凑格式重建（基础规则集重新从全局注册表解析）
    pub fn from_compact_form(compact: &str) -> EnhancerResult<Self> {
        Self::from_compact_form_in(global_registry()?, compact)
    }

    pub fn from_compact_form_in(registry: &BaseRegistry, compact: &str) -> EnhancerResult<Self> {
        // 输入可能是zlib或带填充的形式，紧凑格式由 to_compact_form 重新规范编码
        let (version, bases, rules) = decode_compact(compact)?.into_parts()?;
        Self::build(registry, None, version, bases, rules)
    }

    fn build(
        registry: &BaseRegistry,
        id: Option<String>,
        version: u32,
        bases: Vec<String>,
        rules: RuleSetVariant,
    ) -> EnhancerResult<Self> {
        let mut effective = RuleSet::empty();
        for base_id in &bases {
            let base = registry
                .get(base_id)
                .ok_or_else(|| EnhancerError::UnknownBase(base_id.clone()))?;
            effective.extend_from(base.effective());
        }
        effective.extend_from(&rules.upgrade());

        Ok(Self {
            id,
            version,
            bases,
            rules,
            effective,
            compact: OnceCell::new(),
        })
    }

    /// 注册表中的默认规则集；id 为空时使用配置中的默认id
    pub fn default_enhancements(id: Option<&str>) -> EnhancerResult<Arc<Enhancements>> {
        let id = id.unwrap_or(enhancer_config().default_enhancements_id.as_str());
        global_registry()?
            .get(id)
            .cloned()
            .ok_or_else(|| EnhancerError::UnknownBase(id.to_string()))
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    pub fn rules(&self) -> &RuleSetVariant {
        &self.rules
    }

    pub fn effective(&self) -> &RuleSet {
        &self.effective
    }

    /// 第一个基础规则集为 legacy 时，不做应用内变体的系统帧特殊处理
    fn has_legacy_base(&self) -> bool {
        self.bases.first().is_some_and(|base| base.starts_with("legacy"))
    }

    /// 紧凑格式（首次调用时编码并缓存）
    pub fn to_compact_form(&self) -> EnhancerResult<&str> {
        self.compact
            .get_or_try_init(|| {
                let structure = ConfigStructure::from_variant(self.version, &self.bases, &self.rules);
                Ok::<_, EnhancerError>(encode_compact(&structure)?)
            })
            .map(String::as_str)
    }

    pub(crate) fn prime_compact_form(&self, compact: String) {
        let _ = self.compact.set(compact);
    }

    pub fn as_dict(&self, with_rules: bool) -> EnhancementsDict {
        let latest = self.id.as_deref() == Some(enhancer_config().default_enhancements_id.as_str());
        let mut dict = EnhancementsDict {
            id: self.id.clone(),
            bases: self.bases.clone(),
            latest,
            rules: None,
            classifier_rules: None,
            contributes_rules: None,
        };
        if with_rules {
            if let RuleSetVariant::Legacy(rules) = &self.rules {
                dict.rules = Some(rules.iter().map(|r| EnhancementRuleDict::from(&**r)).collect());
            }
            let own = self.rules.upgrade();
            dict.classifier_rules =
                Some(own.classifier_rules().iter().map(|r| EnhancementRuleDict::from(&**r)).collect());
            dict.contributes_rules =
                Some(own.contributes_rules().iter().map(|r| EnhancementRuleDict::from(&**r)).collect());
        }
        dict
    }

    fn match_frames(frames: &[Frame], platform: Option<&str>) -> Vec<MatchFrame> {
        frames
            .iter()
            .map(|frame| frame.create_match_frame(platform))
            .collect()
    }

    /// 分类阶段：把 category / in_app 结果写回帧记录
    pub fn apply_category_and_updated_in_app_to_frames(
        &self,
        frames: &mut [Frame],
        platform: Option<&str>,
        exception: &ExceptionData,
    ) {
        let match_frames = Self::match_frames(frames, platform);
        let results = self
            .effective
            .apply_modifications_to_frames(&match_frames, exception);

        let mut changed = 0usize;
        for (frame, result) in frames.iter_mut().zip(results) {
            frame.record_client_in_app();
            if let Some(in_app) = result.in_app {
                if frame.in_app != Some(in_app) {
                    changed += 1;
                }
                frame.set_in_app(in_app);
            }
            if let Some(category) = result.category {
                frame.data.category = Some(category);
            }
        }
        log::debug!(
            "Frames classified | frames: {} | in_app changed: {}",
            frames.len(),
            changed
        );
    }

    /// 贡献阶段：按分组变体组装堆栈组件
    pub fn assemble_stacktrace_component(
        &self,
        variant: GroupingVariant,
        mut frame_components: Vec<FrameGroupingComponent>,
        frames: &[Frame],
        platform: Option<&str>,
        exception: &ExceptionData,
    ) -> StacktraceGroupingComponent {
        let match_frames = Self::match_frames(frames, platform);
        let mut engine_components: Vec<Component> = frame_components
            .iter()
            .map(|c| Component::new(c.contributes))
            .collect();
        let state = self.effective.assemble_stacktrace_component(
            &match_frames,
            exception,
            &mut engine_components,
        );

        let app_rules_apply = variant == GroupingVariant::App && !self.has_legacy_base();
        let mut frame_counts = FrameCounts::default();

        for (component, engine) in frame_components.iter_mut().zip(engine_components) {
            if app_rules_apply && !component.in_app {
                // 系统帧在应用内变体中永不贡献；只保留解释 in_app 变化的提示
                let hint = engine
                    .hint
                    .filter(|hint| hint.starts_with("marked out of app"));
                component.update(Some(false), hint);
            } else if variant == GroupingVariant::System {
                let hint = engine.hint.filter(|hint| {
                    !hint.starts_with("marked in-app") && !hint.starts_with("marked out of app")
                });
                component.update(Some(engine.contributes), hint);
            } else {
                component.update(Some(engine.contributes), engine.hint);
            }
            frame_counts.tally(component);
        }

        // 应用内变体没有贡献的应用内帧时，堆栈整体不贡献（优先于 @+group 与 min-frames）
        let (contributes, hint) = if app_rules_apply && frame_counts.in_app_contributing_frames == 0 {
            (false, None)
        } else {
            (state.contributes, state.hint)
        };

        StacktraceGroupingComponent {
            values: frame_components,
            contributes,
            hint,
            frame_counts,
            invert_stacktrace: state.invert_stacktrace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> BaseRegistry {
        BaseRegistry::from_configs([
            ("common:test", "function:shared +app\nfunction:vendored_* -app"),
            ("legacy:test", "function:lib_* -app"),
        ])
        .unwrap()
    }

    fn enhancements(text: &str, bases: &[&str]) -> Enhancements {
        Enhancements::from_rules_text_in(
            &registry(),
            text,
            bases.iter().map(|b| b.to_string()).collect(),
            Some("project:test"),
            Some(3),
        )
        .unwrap()
    }

    fn frame(function: &str, in_app: bool) -> Frame {
        Frame {
            function: Some(function.to_string()),
            in_app: Some(in_app),
            ..Default::default()
        }
    }

    fn components_for(frames: &[Frame]) -> Vec<FrameGroupingComponent> {
        frames
            .iter()
            .map(|f| FrameGroupingComponent::new(f.in_app.unwrap_or(false), true))
            .collect()
    }

    #[test]
    fn test_panic_handler_end_to_end() {
        let enhancements = enhancements("stack.function:panic_handler -app", &[]);
        let exception = ExceptionData::default();
        let mut frames = vec![
            frame("main", true),
            frame("panic_handler", true),
            frame("run", true),
        ];

        enhancements.apply_category_and_updated_in_app_to_frames(&mut frames, None, &exception);
        assert_eq!(frames[1].in_app, Some(false));
        assert_eq!(frames[1].data.orig_in_app, Some(1));
        assert_eq!(frames[1].data.client_in_app, Some(Some(true)));
        assert_eq!(frames[0].data.orig_in_app, None);

        let components = components_for(&frames);
        let stacktrace = enhancements.assemble_stacktrace_component(
            GroupingVariant::App,
            components,
            &frames,
            None,
            &exception,
        );

        assert!(!stacktrace.values[1].contributes);
        assert_eq!(
            stacktrace.values[1].hint.as_deref(),
            Some("marked out of app by stack trace rule (stack.function:panic_handler)")
        );
        assert_eq!(
            stacktrace.frame_counts,
            FrameCounts {
                in_app_contributing_frames: 2,
                system_non_contributing_frames: 1,
                ..Default::default()
            }
        );
        assert!(stacktrace.contributes);
    }

    #[test]
    fn test_bases_are_merged_before_own_rules() {
        let enhancements = enhancements("function:shared -app", &["common:test"]);
        let texts: Vec<_> = enhancements
            .effective()
            .classifier_rules()
            .iter()
            .map(|r| r.text().to_string())
            .collect();
        assert_eq!(
            texts,
            vec!["function:shared +app", "function:vendored_* -app", "function:shared -app"]
        );

        let mut frames = vec![frame("shared", true), frame("vendored_zlib", true)];
        enhancements.apply_category_and_updated_in_app_to_frames(
            &mut frames,
            None,
            &ExceptionData::default(),
        );
        assert_eq!(frames[0].in_app, Some(false));
        assert_eq!(frames[1].in_app, Some(false));
    }

    #[test]
    fn test_later_category_wins() {
        let enhancements = enhancements("path:*.py category=py\npath:*.py category=override", &[]);
        let mut frames = vec![Frame {
            abs_path: Some("main.py".to_string()),
            ..Default::default()
        }];
        enhancements.apply_category_and_updated_in_app_to_frames(
            &mut frames,
            None,
            &ExceptionData::default(),
        );
        assert_eq!(frames[0].data.category.as_deref(), Some("override"));
        assert_eq!(frames[0].data.orig_in_app, None);
    }

    #[test]
    fn test_negated_function_matcher() {
        let enhancements = enhancements("!function:main -app", &[]);
        let mut frames = vec![frame("main", true), frame("mainly", true), frame("Main", true)];
        enhancements.apply_category_and_updated_in_app_to_frames(
            &mut frames,
            None,
            &ExceptionData::default(),
        );
        let in_app: Vec<_> = frames.iter().map(|f| f.in_app).collect();
        assert_eq!(in_app, vec![Some(true), Some(false), Some(false)]);
    }

    #[test]
    fn test_system_frames_never_contribute_in_app_variant() {
        let enhancements = enhancements("function:lib +group", &[]);
        let exception = ExceptionData::default();
        let frames = vec![frame("main", true), frame("lib", false)];

        let app = enhancements.assemble_stacktrace_component(
            GroupingVariant::App,
            components_for(&frames),
            &frames,
            None,
            &exception,
        );
        assert!(!app.values[1].contributes);
        assert!(app.contributes);

        let default = enhancements.assemble_stacktrace_component(
            GroupingVariant::Default,
            components_for(&frames),
            &frames,
            None,
            &exception,
        );
        assert!(default.values[1].contributes);
    }

    #[test]
    fn test_system_variant_drops_in_app_hints() {
        let enhancements = enhancements("function:helper -app", &[]);
        let exception = ExceptionData::default();
        let mut frames = vec![frame("main", true), frame("helper", true)];
        enhancements.apply_category_and_updated_in_app_to_frames(&mut frames, None, &exception);

        let system = enhancements.assemble_stacktrace_component(
            GroupingVariant::System,
            components_for(&frames),
            &frames,
            None,
            &exception,
        );
        assert!(system.values[1].contributes);
        assert_eq!(system.values[1].hint, None);
        assert_eq!(system.frame_counts.system_contributing_frames, 1);
    }

    #[test]
    fn test_zero_in_app_contributing_frames_beats_stacktrace_group() {
        let enhancements = enhancements("function:* -group\nfunction:main @+group", &[]);
        let exception = ExceptionData::default();
        let frames = vec![frame("main", true), frame("run", true)];

        let app = enhancements.assemble_stacktrace_component(
            GroupingVariant::App,
            components_for(&frames),
            &frames,
            None,
            &exception,
        );
        assert!(!app.contributes);
        assert_eq!(app.hint, None);
        assert_eq!(app.frame_counts.in_app_non_contributing_frames, 2);

        // 其它变体保留堆栈级规则的结论
        let system = enhancements.assemble_stacktrace_component(
            GroupingVariant::System,
            components_for(&frames),
            &frames,
            None,
            &exception,
        );
        assert!(system.contributes);
        assert_eq!(
            system.hint.as_deref(),
            Some("stack trace marked as contributing by stack trace rule (function:main)")
        );
    }

    #[test]
    fn test_zero_in_app_contributing_frames_beats_min_frames() {
        let enhancements = enhancements("function:* min-frames=1", &[]);
        let exception = ExceptionData::default();
        let frames = vec![frame("lib", false)];

        let app = enhancements.assemble_stacktrace_component(
            GroupingVariant::App,
            components_for(&frames),
            &frames,
            None,
            &exception,
        );
        assert!(!app.contributes);
        assert_eq!(app.hint, None);
    }

    #[test]
    fn test_legacy_base_skips_app_variant_override() {
        let enhancements = enhancements("", &["legacy:test"]);
        let exception = ExceptionData::default();
        let frames = vec![frame("lib_json", false)];

        let app = enhancements.assemble_stacktrace_component(
            GroupingVariant::App,
            components_for(&frames),
            &frames,
            None,
            &exception,
        );
        assert!(app.values[0].contributes);
        assert!(app.contributes);
    }

    #[test]
    fn test_unknown_base_and_version() {
        let err = Enhancements::from_rules_text_in(
            &registry(),
            "",
            vec!["does-not-exist".to_string()],
            None,
            None,
        )
        .unwrap_err();
        assert!(err.is_configuration_error());

        let err = Enhancements::from_rules_text_in(&registry(), "", vec![], None, Some(7)).unwrap_err();
        assert!(matches!(err, EnhancerError::UnknownVersion(7)));

        let err = Enhancements::from_rules_text_in(&registry(), "function:a +nope", vec![], None, None)
            .unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_compact_round_trip_behaves_identically() {
        let registry = registry();
        let original = Enhancements::from_rules_text_in(
            &registry,
            "function:helper -app category=helpers\nfunction:* max-frames=2",
            vec!["common:test".to_string()],
            None,
            None,
        )
        .unwrap();

        let compact = original.to_compact_form().unwrap().to_string();
        let restored = Enhancements::from_compact_form_in(&registry, &compact).unwrap();
        assert_eq!(restored.version(), original.version());
        assert_eq!(restored.bases(), original.bases());
        assert_eq!(restored.effective(), original.effective());
        assert_eq!(restored.to_compact_form().unwrap(), compact);

        let exception = ExceptionData::default();
        let mut a = vec![frame("helper", true), frame("shared", false), frame("run", true)];
        let mut b = a.clone();
        original.apply_category_and_updated_in_app_to_frames(&mut a, None, &exception);
        restored.apply_category_and_updated_in_app_to_frames(&mut b, None, &exception);
        assert_eq!(a, b);
    }

    #[test]
    fn test_compact_form_is_canonical_for_equivalent_inputs() {
        let registry = registry();
        let original = enhancements("function:helper -app\nfunction:* -group", &["common:test"]);
        let canonical = original.to_compact_form().unwrap().to_string();

        let structure = ConfigStructure::from_variant(original.version(), original.bases(), original.rules());
        let zlib = frame_enhancer_engine::encode_compact_with(
            &structure,
            frame_enhancer_engine::Compressor::Zlib,
        )
        .unwrap();
        assert_ne!(zlib, canonical);

        for input in [zlib.clone(), format!("{}==", canonical), format!("  {}\n", zlib)] {
            let restored = Enhancements::from_compact_form_in(&registry, &input).unwrap();
            assert_eq!(restored.to_compact_form().unwrap(), canonical);
        }
    }

    #[test]
    fn test_legacy_version_round_trip() {
        let registry = registry();
        let legacy = Enhancements::from_rules_text_in(
            &registry,
            "function:a -app -group",
            vec![],
            None,
            Some(2),
        )
        .unwrap();
        assert!(legacy.rules().is_legacy());

        let restored =
            Enhancements::from_compact_form_in(&registry, legacy.to_compact_form().unwrap()).unwrap();
        assert_eq!(restored.version(), 2);
        assert!(restored.rules().is_legacy());
        assert_eq!(restored.effective(), legacy.effective());

        let dict = restored.as_dict(true);
        assert_eq!(dict.rules.as_ref().map(Vec::len), Some(1));
        assert_eq!(dict.contributes_rules.unwrap()[0].text, "function:a -group");
    }

    #[test]
    fn test_version_gate_on_decode() {
        let structure = ConfigStructure::Split(42, vec![], vec![], vec![]);
        let compact = encode_compact(&structure).unwrap();
        let err = Enhancements::from_compact_form_in(&registry(), &compact).unwrap_err();
        assert!(err.is_configuration_error());

        let err = Enhancements::from_compact_form_in(&registry(), "@@@").unwrap_err();
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_as_dict_without_rules() {
        let dict = enhancements("function:a -app", &["common:test"]).as_dict(false);
        assert_eq!(dict.id.as_deref(), Some("project:test"));
        assert_eq!(dict.bases, vec!["common:test"]);
        assert!(!dict.latest);
        assert!(dict.rules.is_none() && dict.classifier_rules.is_none());
    }

    #[cfg(feature = "embedded-rules")]
    #[test]
    fn test_default_enhancements() {
        let default = Enhancements::default_enhancements(None).unwrap();
        assert_eq!(default.id(), Some(crate::config::DEFAULT_GROUPING_ENHANCEMENTS_ID));
        assert!(default.as_dict(false).latest);
        assert!(Enhancements::default_enhancements(Some("nope:1")).is_err());

        let derived =
            Enhancements::from_rules_text("", vec!["common:2019-03-23".to_string()], None, None)
                .unwrap();
        assert!(!derived.effective().is_empty());
    }
}
