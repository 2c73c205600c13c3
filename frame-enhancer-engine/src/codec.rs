//! 紧凑格式编解码
//! 结构：v2 `[2, bases, rules]`，v3 `[3, bases, classifier_rules, contributes_rules]`
//! 规则：`[matchers, actions, text]`；匹配器：`[key, pattern, negated, offset]`；动作为规范文本
//! 编码链：MessagePack → zstd → URL安全base64（无填充）
//! 解码兼容：填充可有可无；非zstd魔数的负载按zlib处理

use std::fmt;
use std::io::{Cursor, Read, Write};
use std::sync::Arc;

use base64::alphabet;
use base64::engine::general_purpose::GeneralPurpose;
use base64::engine::{DecodePaddingMode, GeneralPurposeConfig};
use base64::Engine as _;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::de::{IgnoredAny, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::FrameOffset;
use crate::error::{EngineError, EngineResult};
use crate::matcher::FrameMatcher;
use crate::rule::{parse_action, EnhancementRule, RuleSet, RuleSetVariant};

/// 可识别的格式版本
pub const VERSIONS: &[u32] = &[2, 3];
/// 当前写出的版本
pub const LATEST_VERSION: u32 = 3;

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];
const ZSTD_LEVEL: i32 = 3;

const COMPACT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// 压缩算法（写出默认zstd，zlib仅用于兼容旧负载）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compressor {
    #[default]
    Zstd,
    Zlib,
}

/// `[key, pattern, negated, offset]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherStructure(pub String, pub String, pub bool, pub i8);

/// `[matchers, actions, text]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleStructure(pub Vec<MatcherStructure>, pub Vec<String>, pub String);

impl RuleStructure {
    pub fn from_rule(rule: &EnhancementRule) -> Self {
        let matchers = rule
            .matchers()
            .iter()
            .map(|m| {
                MatcherStructure(
                    m.key().to_string(),
                    m.pattern().to_string(),
                    m.negated(),
                    m.offset().as_i8(),
                )
            })
            .collect();
        let actions = rule.actions().iter().map(ToString::to_string).collect();
        RuleStructure(matchers, actions, rule.text().to_string())
    }

    /// 重建规则；负载中的非法匹配器/动作视为解码错误
    pub fn into_rule(self) -> EngineResult<EnhancementRule> {
        let RuleStructure(matcher_structures, action_texts, text) = self;

        let mut matchers = Vec::with_capacity(matcher_structures.len());
        for MatcherStructure(key, pattern, negated, offset) in matcher_structures {
            let offset = FrameOffset::from_i8(offset)
                .ok_or_else(|| EngineError::DecodeError(format!("invalid matcher offset {}", offset)))?;
            let matcher = FrameMatcher::new(&key, &pattern, negated, offset)
                .map_err(|e| EngineError::DecodeError(format!("invalid matcher in payload: {}", e)))?;
            matchers.push(matcher);
        }
        if matchers.is_empty() {
            return Err(EngineError::DecodeError(format!("rule without matchers: '{}'", text)));
        }

        let actions = action_texts
            .iter()
            .map(|token| parse_action(token))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| EngineError::DecodeError(format!("invalid action in payload: {}", e)))?;

        let rule = EnhancementRule::new(matchers, actions);
        if rule.text() != text {
            log::warn!(
                "Decoded rule text differs from payload | payload: {} | rebuilt: {}",
                text,
                rule.text()
            );
        }
        Ok(rule)
    }
}

/// 紧凑格式顶层结构（按元素个数区分 v3 拆分 / v2 混合）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigStructure {
    Split(u32, Vec<String>, Vec<RuleStructure>, Vec<RuleStructure>),
    Legacy(u32, Vec<String>, Vec<RuleStructure>),
}

impl ConfigStructure {
    pub fn from_variant(version: u32, bases: &[String], rules: &RuleSetVariant) -> Self {
        let encode_all = |rules: &[Arc<EnhancementRule>]| {
            rules.iter().map(|r| RuleStructure::from_rule(r)).collect::<Vec<_>>()
        };
        match rules {
            RuleSetVariant::Legacy(rules) => {
                ConfigStructure::Legacy(version, bases.to_vec(), encode_all(rules.as_slice()))
            }
            RuleSetVariant::Split(rule_set) => ConfigStructure::Split(
                version,
                bases.to_vec(),
                encode_all(rule_set.classifier_rules()),
                encode_all(rule_set.contributes_rules()),
            ),
        }
    }

    pub fn version(&self) -> u32 {
        match self {
            ConfigStructure::Split(version, ..) | ConfigStructure::Legacy(version, ..) => *version,
        }
    }

    pub fn bases(&self) -> &[String] {
        match self {
            ConfigStructure::Split(_, bases, ..) | ConfigStructure::Legacy(_, bases, _) => bases,
        }
    }

    /// 拆解为 (版本, 基础规则集id, 规则)
    pub fn into_parts(self) -> EngineResult<(u32, Vec<String>, RuleSetVariant)> {
        let decode_all = |rules: Vec<RuleStructure>| {
            rules
                .into_iter()
                .map(RuleStructure::into_rule)
                .collect::<EngineResult<Vec<_>>>()
        };
        match self {
            ConfigStructure::Legacy(version, bases, rules) => {
                let rules = decode_all(rules)?.into_iter().map(Arc::new).collect();
                Ok((version, bases, RuleSetVariant::Legacy(rules)))
            }
            ConfigStructure::Split(version, bases, classifier, contributes) => {
                let rule_set = RuleSet::from_split(decode_all(classifier)?, decode_all(contributes)?);
                Ok((version, bases, RuleSetVariant::Split(rule_set)))
            }
        }
    }
}

/// 只读取首元素（版本号）的探针，其余元素跳过
/// 按i64读取：超出u32范围或为负数的版本同样属于未知版本
struct VersionProbe(i64);

impl<'de> Deserialize<'de> for VersionProbe {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ProbeVisitor;

        impl<'de> Visitor<'de> for ProbeVisitor {
            type Value = VersionProbe;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array starting with a format version")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let version: i64 = seq
                    .next_element()?
                    .ok_or_else(|| serde::de::Error::invalid_length(0, &self))?;
                while seq.next_element::<IgnoredAny>()?.is_some() {}
                Ok(VersionProbe(version))
            }
        }

        deserializer.deserialize_seq(ProbeVisitor)
    }
}

pub fn encode_compact(structure: &ConfigStructure) -> EngineResult<String> {
    encode_compact_with(structure, Compressor::Zstd)
}

pub fn encode_compact_with(structure: &ConfigStructure, compressor: Compressor) -> EngineResult<String> {
    encode_payload(structure, compressor)
}

fn encode_payload<T: Serialize>(payload: &T, compressor: Compressor) -> EngineResult<String> {
    let packed = rmp_serde::to_vec(payload)?;
    let compressed = match compressor {
        Compressor::Zstd => zstd::encode_all(Cursor::new(&packed), ZSTD_LEVEL)?,
        Compressor::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&packed)?;
            encoder.finish()?
        }
    };
    log::debug!(
        "Compact form encoded | msgpack: {} bytes | compressed: {} bytes | compressor: {:?}",
        packed.len(),
        compressed.len(),
        compressor
    );
    Ok(COMPACT_BASE64.encode(compressed))
}

/// 解码紧凑格式；版本不识别 → ConfigurationError，其余损坏 → DecodeError
pub fn decode_compact(input: &str) -> EngineResult<ConfigStructure> {
    let trimmed = input.trim().trim_end_matches('=');
    let compressed = COMPACT_BASE64
        .decode(trimmed)
        .map_err(|e| EngineError::DecodeError(format!("invalid base64: {}", e)))?;

    let packed = if compressed.starts_with(&ZSTD_MAGIC) {
        zstd::decode_all(Cursor::new(&compressed))
            .map_err(|e| EngineError::DecodeError(format!("invalid zstd payload: {}", e)))?
    } else {
        let mut packed = Vec::new();
        ZlibDecoder::new(compressed.as_slice())
            .read_to_end(&mut packed)
            .map_err(|e| EngineError::DecodeError(format!("invalid zlib payload: {}", e)))?;
        packed
    };

    let VersionProbe(raw_version) = rmp_serde::from_slice(&packed)
        .map_err(|e| EngineError::DecodeError(format!("invalid structure: {}", e)))?;
    let version = u32::try_from(raw_version)
        .ok()
        .filter(|v| VERSIONS.contains(v))
        .ok_or_else(|| {
            EngineError::ConfigurationError(format!("unknown enhancements version {}", raw_version))
        })?;

    let structure: ConfigStructure = rmp_serde::from_slice(&packed)
        .map_err(|e| EngineError::DecodeError(format!("invalid structure: {}", e)))?;
    match (&structure, version) {
        (ConfigStructure::Legacy(..), 2) | (ConfigStructure::Split(..), 3) => Ok(structure),
        _ => Err(EngineError::DecodeError(format!(
            "structure does not match version {}",
            version
        ))),
    }
}
