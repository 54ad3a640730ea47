use serde::{Deserialize, Serialize};
use post_enhancer::error::ValidationError;
use post_enhancer::history::LocalHistoryRecord;
use post_enhancer::{
    Category, ContentSource, Diagnostics, EnhanceError, EnhancementRequest, EnhancementResult,
    PlatformContent, PlatformSlot, Tone,
};

#[derive(Debug, Deserialize)]
pub struct ApiEnhanceRequest {
    pub text: Option<String>,
    pub request_id: Option<String>,
    pub category: Option<String>,
    pub tone: Option<String>,
    pub platforms: Option<Vec<String>>,
    pub user_id: Option<String>,
}

impl ApiEnhanceRequest {
    pub fn into_request(self) -> Result<EnhancementRequest, ValidationError> {
        let text = self.text.unwrap_or_default();
        let category = match self.category.as_deref() {
            Some(value) => value.parse::<Category>()?,
            None => Category::General,
        };
        let tone = self
            .tone
            .as_deref()
            .ok_or(ValidationError::MissingField("tone"))?
            .parse::<Tone>()?;
        let platforms = self
            .platforms
            .unwrap_or_default()
            .iter()
            .map(|value| value.parse::<PlatformSlot>())
            .collect::<Result<Vec<_>, _>>()?;
        EnhancementRequest::new(text, category, tone, platforms)
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiScoreRequest {
    pub text: Option<String>,
    pub category: Option<String>,
    pub tone: Option<String>,
}

impl ApiScoreRequest {
    pub fn into_parts(self) -> Result<(String, Category, Tone), ValidationError> {
        let text = self.text.unwrap_or_default().trim().to_string();
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        let category = match self.category.as_deref() {
            Some(value) => value.parse::<Category>()?,
            None => Category::General,
        };
        let tone = self
            .tone
            .as_deref()
            .ok_or(ValidationError::MissingField("tone"))?
            .parse::<Tone>()?;
        Ok((text, category, tone))
    }
}

#[derive(Debug, Serialize)]
pub struct ApiEnhanceResponse {
    pub request_id: String,
    pub platform_content: PlatformContent,
    pub diagnostics: Diagnostics,
    pub source: ContentSource,
}

impl ApiEnhanceResponse {
    pub fn from_result(result: EnhancementResult, request_id: String) -> Self {
        Self {
            request_id,
            platform_content: result.platform_content,
            diagnostics: result.diagnostics,
            source: result.source,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiHistoryResponse {
    pub records: Vec<LocalHistoryRecord>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_usage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
}

impl From<&EnhanceError> for ApiError {
    fn from(err: &EnhanceError) -> Self {
        let (current_usage, monthly_limit, plan_name) = match err {
            EnhanceError::UsageLimitReached {
                current,
                limit,
                plan,
            } => (Some(*current), Some(*limit), Some(plan.clone())),
            _ => (None, None, None),
        };
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            current_usage,
            monthly_limit,
            plan_name,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::from(&EnhanceError::Validation(err))
    }
}
