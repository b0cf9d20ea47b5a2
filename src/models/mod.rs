//! Supported model catalog and reasoning-configuration resolution.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Model used when nothing else is requested.
pub const DEFAULT_MODEL_ID: &str = "gpt-5-nano";

/// Reasoning effort level for reasoning models.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReasoningEffort {
    None,
    Minimal,
    Low,
    Medium,
    High,
    Xhigh,
}

/// How much of the model's reasoning is summarized back to the caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReasoningSummary {
    Auto,
    Concise,
    Detailed,
}

/// A fully resolved reasoning configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ReasoningConfig {
    pub effort: ReasoningEffort,
    pub summary: ReasoningSummary,
}

/// Caller-supplied reasoning overrides; either half may be absent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReasoningOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort: Option<ReasoningEffort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<ReasoningSummary>,
}

impl ReasoningOverride {
    /// `None` when neither half is set.
    pub fn non_empty(self) -> Option<Self> {
        (self.effort.is_some() || self.summary.is_some()).then_some(self)
    }
}

/// Reasoning options a model accepts.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelReasoningSupport {
    pub effort_options: &'static [ReasoningEffort],
    pub summary_options: &'static [ReasoningSummary],
    pub default: ReasoningConfig,
}

/// Model vendor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModelProviderKind {
    OpenAi,
}

/// A catalog entry.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupportedModel {
    pub id: &'static str,
    pub label: &'static str,
    pub provider: ModelProviderKind,
    pub supports_native_reasoning: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ModelReasoningSupport>,
    pub is_default: bool,
}

const GPT5_EFFORTS: &[ReasoningEffort] = &[
    ReasoningEffort::None,
    ReasoningEffort::Minimal,
    ReasoningEffort::Low,
    ReasoningEffort::Medium,
    ReasoningEffort::High,
];

const GPT5_SUMMARIES: &[ReasoningSummary] = &[
    ReasoningSummary::Auto,
    ReasoningSummary::Concise,
    ReasoningSummary::Detailed,
];

const GPT5_REASONING: ModelReasoningSupport = ModelReasoningSupport {
    effort_options: GPT5_EFFORTS,
    summary_options: GPT5_SUMMARIES,
    default: ReasoningConfig {
        effort: ReasoningEffort::Medium,
        summary: ReasoningSummary::Auto,
    },
};

/// Every model turns may run on.
pub static SUPPORTED_MODELS: &[SupportedModel] = &[
    SupportedModel {
        id: "gpt-5-nano",
        label: "GPT-5 Nano",
        provider: ModelProviderKind::OpenAi,
        supports_native_reasoning: true,
        reasoning: Some(GPT5_REASONING),
        is_default: true,
    },
    SupportedModel {
        id: "gpt-5-mini",
        label: "GPT-5 Mini",
        provider: ModelProviderKind::OpenAi,
        supports_native_reasoning: true,
        reasoning: Some(GPT5_REASONING),
        is_default: false,
    },
    SupportedModel {
        id: "gpt-4o-mini",
        label: "GPT-4o Mini",
        provider: ModelProviderKind::OpenAi,
        supports_native_reasoning: false,
        reasoning: None,
        is_default: false,
    },
];

/// Look up a catalog entry by id.
pub fn find_model(id: &str) -> Option<&'static SupportedModel> {
    SUPPORTED_MODELS.iter().find(|model| model.id == id)
}

/// Pick the model a turn runs on.
///
/// A supported `requested` id wins; otherwise `fallback` if it is supported;
/// otherwise [`DEFAULT_MODEL_ID`].
pub fn resolve_model_id(requested: Option<&str>, fallback: &str) -> &'static str {
    requested
        .and_then(find_model)
        .or_else(|| find_model(fallback))
        .map(|model| model.id)
        .unwrap_or(DEFAULT_MODEL_ID)
}

/// Resolve the reasoning configuration for `model_id`.
///
/// Models without native reasoning resolve to `None`. Each requested option
/// the model does not accept falls back to the model default.
pub fn resolve_reasoning_config(
    model_id: &str,
    requested: Option<ReasoningOverride>,
) -> Option<ReasoningConfig> {
    let model = find_model(model_id)?;
    if !model.supports_native_reasoning {
        return None;
    }
    let support = model.reasoning.as_ref()?;
    let requested = requested.unwrap_or_default();

    let effort = requested
        .effort
        .filter(|e| support.effort_options.contains(e))
        .unwrap_or(support.default.effort);
    let summary = requested
        .summary
        .filter(|s| support.summary_options.contains(s))
        .unwrap_or(support.default.summary);

    Some(ReasoningConfig { effort, summary })
}

/// A model id paired with its resolved reasoning configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedModel {
    pub model_id: String,
    pub reasoning: Option<ReasoningConfig>,
}

impl ResolvedModel {
    pub fn resolve(
        requested_model: Option<&str>,
        fallback_model: &str,
        reasoning: Option<ReasoningOverride>,
    ) -> Self {
        let model_id = resolve_model_id(requested_model, fallback_model);
        Self {
            model_id: model_id.to_string(),
            reasoning: resolve_reasoning_config(model_id, reasoning),
        }
    }

    /// Key under which a built agent graph is cached.
    pub fn cache_key(&self) -> String {
        match self.reasoning {
            None => format!("{}|reasoning:none", self.model_id),
            Some(r) => format!("{}|effort:{}|summary:{}", self.model_id, r.effort, r.summary),
        }
    }
}
