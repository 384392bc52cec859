use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SUGGESTIONS_PROMPT: &str = r#"Analyze this task and provide optimization suggestions:

interface Suggestion {
  timeOfDay: string;
  restBreaks: string[];
  productivity: string;
}

{
  "timeOfDay": "Morning (8-10 AM) would be optimal for this task",
  "restBreaks": ["Take a 5-min break every 25 mins", "15-min break after 2 hours"],
  "productivity": "This task aligns well with your high-energy morning pattern"
}
"#;

const PREDICTION_PROMPT: &str = r#"Analyze this task and predict success rate:

interface Prediction {
  successRate: number;
  confidence: number;
  factors: string[];
  recommendations: string[];
}

{
  "successRate": 85,
  "confidence": 90,
  "factors": [
    "Similar tasks completed successfully",
    "Optimal time scheduling",
    "Matches user productivity pattern"
  ],
  "recommendations": [
    "Schedule during morning hours",
    "Break into smaller subtasks",
    "Set reminder 30 minutes before"
  ]
}
"#;

const REST_PATTERN_PROMPT: &str = r#"Analyze work patterns and suggest optimal rest periods:

interface RestSuggestion {
  suggestedBreaks: string[];
  restDuration: string;
  reasoning: string;
}

{
  "suggestedBreaks": ["2:30 PM - 3:00 PM", "5:00 PM - 5:15 PM"],
  "restDuration": "30 minutes for main break, 15 minutes for short break",
  "reasoning": "Based on your pattern of decreased productivity in mid-afternoon"
}
"#;

const MOTIVATION_PROMPT: &str = r#"Generate an encouraging motivational message:

interface MotivationalMessage {
  message: string;
  theme: string; // 'success' | 'encouragement' | 'challenge'
}

{
  "message": "Small steps lead to big achievements. Keep pushing forward!",
  "theme": "encouragement"
}
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryIntent {
    Suggestions,
    Prediction,
    RestPattern,
    Motivation,
}

fn prompt_for(intent: AdvisoryIntent) -> &'static str {
    match intent {
        AdvisoryIntent::Suggestions => SUGGESTIONS_PROMPT,
        AdvisoryIntent::Prediction => PREDICTION_PROMPT,
        AdvisoryIntent::RestPattern => REST_PATTERN_PROMPT,
        AdvisoryIntent::Motivation => MOTIVATION_PROMPT,
    }
}

/// The service speaks camelCase; these mirror its wire shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSuggestions {
    pub time_of_day: String,
    pub rest_breaks: Vec<String>,
    pub productivity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPrediction {
    pub success_rate: f64,
    pub confidence: f64,
    pub factors: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestAnalysis {
    pub suggested_breaks: Vec<String>,
    pub rest_duration: String,
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageTheme {
    Success,
    Encouragement,
    Challenge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotivationalMessage {
    pub message: String,
    pub theme: MessageTheme,
}

impl MotivationalMessage {
    /// Canned encouragement used when the service is unreachable.
    pub fn fallback() -> Self {
        Self {
            message: "Stay focused and keep going!".to_string(),
            theme: MessageTheme::Encouragement,
        }
    }
}

pub fn build_request_body(intent: AdvisoryIntent, data: Value) -> Value {
    serde_json::json!({
        "prompt": prompt_for(intent),
        "data": data,
    })
}

/// Parses a service response, tolerating fenced code blocks and surrounding
/// prose around the JSON payload.
pub fn parse_response<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("empty advisory response".to_string());
    }

    let mut candidate = trimmed;
    if let Some(stripped) = strip_fenced_code_block(candidate) {
        candidate = stripped;
    }

    if let Ok(value) = serde_json::from_str::<T>(candidate) {
        return Ok(value);
    }

    // Fallback: extract the first {...} region (best-effort).
    if let Some(extracted) = extract_first_json_object(candidate) {
        if let Ok(value) = serde_json::from_str::<T>(extracted) {
            return Ok(value);
        }
    }

    Err("failed to parse advisory response as json".to_string())
}

fn strip_fenced_code_block(text: &str) -> Option<&str> {
    let mut s = text.trim();
    if !s.starts_with("```") {
        return None;
    }
    // Trim opening fence line.
    if let Some(pos) = s.find('\n') {
        s = &s[pos + 1..];
    } else {
        return None;
    }
    // Trim trailing fence.
    if let Some(end) = s.rfind("```") {
        return Some(s[..end].trim());
    }
    None
}

fn extract_first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(text[start..=end].trim())
}

/// Client for the remote advisory service. Transport failures never
/// propagate: three of the four calls degrade to `None`, while
/// [`AdvisoryClient::motivational_message`] alone falls back to a canned
/// message.
pub struct AdvisoryClient {
    endpoint: String,
}

impl AdvisoryClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub async fn task_suggestions(&self, task_data: Value) -> Option<TaskSuggestions> {
        match self.request(AdvisoryIntent::Suggestions, task_data).await {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("task suggestions unavailable: {err}");
                None
            }
        }
    }

    pub async fn task_prediction(&self, task_data: Value) -> Option<TaskPrediction> {
        match self.request(AdvisoryIntent::Prediction, task_data).await {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("task prediction unavailable: {err}");
                None
            }
        }
    }

    pub async fn rest_analysis(&self, task_history: Value) -> Option<RestAnalysis> {
        match self.request(AdvisoryIntent::RestPattern, task_history).await {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("rest analysis unavailable: {err}");
                None
            }
        }
    }

    pub async fn motivational_message(&self) -> MotivationalMessage {
        let data = Value::Object(serde_json::Map::new());
        match self.request(AdvisoryIntent::Motivation, data).await {
            Ok(value) => value,
            Err(err) => {
                log::warn!("motivational message unavailable: {err}");
                MotivationalMessage::fallback()
            }
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        intent: AdvisoryIntent,
        data: Value,
    ) -> Result<T, String> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| format!("failed to build http client: {err}"))?;

        let resp = client
            .post(&self.endpoint)
            .json(&build_request_body(intent, data))
            .send()
            .await
            .map_err(|err| format!("advisory request failed: {err}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|err| format!("failed to read advisory response: {err}"))?;

        if !status.is_success() {
            return Err(format!("advisory http {status}: {text}"));
        }

        parse_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_prompt_and_data() {
        let body = build_request_body(
            AdvisoryIntent::Suggestions,
            serde_json::json!({"title": "morning run"}),
        );
        let prompt = body["prompt"].as_str().unwrap();
        assert!(prompt.contains("optimization suggestions"));
        assert!(prompt.contains("timeOfDay"));
        assert_eq!(body["data"]["title"], "morning run");

        let body = build_request_body(AdvisoryIntent::Motivation, serde_json::json!({}));
        assert!(body["prompt"].as_str().unwrap().contains("motivational message"));
        assert_eq!(body["data"], serde_json::json!({}));
    }

    #[test]
    fn parses_each_response_shape() {
        let suggestions: TaskSuggestions = parse_response(
            r#"{"timeOfDay":"morning","restBreaks":["5 min"],"productivity":"good fit"}"#,
        )
        .unwrap();
        assert_eq!(suggestions.time_of_day, "morning");
        assert_eq!(suggestions.rest_breaks, vec!["5 min".to_string()]);

        let prediction: TaskPrediction = parse_response(
            r#"{"successRate":85,"confidence":90,"factors":["history"],"recommendations":["split it"]}"#,
        )
        .unwrap();
        assert_eq!(prediction.success_rate, 85.0);
        assert_eq!(prediction.recommendations, vec!["split it".to_string()]);

        let rest: RestAnalysis = parse_response(
            r#"{"suggestedBreaks":["2:30 PM"],"restDuration":"30 minutes","reasoning":"afternoon dip"}"#,
        )
        .unwrap();
        assert_eq!(rest.suggested_breaks, vec!["2:30 PM".to_string()]);

        let message: MotivationalMessage =
            parse_response(r#"{"message":"Keep at it","theme":"challenge"}"#).unwrap();
        assert_eq!(message.theme, MessageTheme::Challenge);
    }

    #[test]
    fn parses_fenced_and_wrapped_json() {
        let fenced = "```json\n{\"message\":\"m\",\"theme\":\"success\"}\n```";
        let message: MotivationalMessage = parse_response(fenced).unwrap();
        assert_eq!(message.theme, MessageTheme::Success);

        let wrapped = "Here you go: {\"message\":\"m\",\"theme\":\"encouragement\"} hope it helps";
        let message: MotivationalMessage = parse_response(wrapped).unwrap();
        assert_eq!(message.message, "m");
    }

    #[test]
    fn rejects_empty_and_unparseable_responses() {
        assert!(parse_response::<MotivationalMessage>("").is_err());
        assert!(parse_response::<MotivationalMessage>("   ").is_err());
        assert!(parse_response::<MotivationalMessage>("no json here").is_err());
        assert!(parse_response::<TaskSuggestions>(r#"{"unexpected":true}"#).is_err());
    }

    #[test]
    fn fallback_message_is_fixed() {
        let fallback = MotivationalMessage::fallback();
        assert_eq!(fallback.message, "Stay focused and keep going!");
        assert_eq!(fallback.theme, MessageTheme::Encouragement);
    }

    #[tokio::test]
    async fn transport_failure_degrades_to_none_except_motivation() {
        // Nothing listens on the discard port; every call fails fast.
        let client = AdvisoryClient::new("http://127.0.0.1:9/api/ai_completion");

        assert!(client.task_suggestions(serde_json::json!({})).await.is_none());
        assert!(client.task_prediction(serde_json::json!({})).await.is_none());
        assert!(client.rest_analysis(serde_json::json!([])).await.is_none());

        let message = client.motivational_message().await;
        assert_eq!(message, MotivationalMessage::fallback());
    }
}
