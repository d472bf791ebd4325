//! services/api/src/adapters/vision_llm.rs
//!
//! This module contains the adapter for the receipt-reading vision LLM.
//! It implements the `ExtractionService` port from the `core` crate.

const EXTRACTION_INSTRUCTIONS: &str = r#"Extract 'name', 'phoneNumber', and 'amount' for a payment receipt. Focus on mobile numbers.
IMPORTANT: Format phoneNumber as a pure string of digits starting with 09 (e.g., 09171234567). If the image shows +639..., convert it to 09... Remove any spaces or dashes.
The amount should be a pure number. If a field is missing, use 'Unknown' or 0.

Respond with ONLY a JSON object of this exact shape, no explanation:
{"name": "<string>", "phoneNumber": "<string>", "amount": <number>}"#;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrlArgs, ResponseFormat,
        ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use base64::Engine as _;
use quickscan_core::{
    domain::{ExtractedPayment, UNKNOWN_NAME},
    ports::{ExtractionError, ExtractionService},
};
use serde::Deserialize;
use tracing::{debug, info};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ExtractionService` using an OpenAI-compatible vision model.
#[derive(Clone)]
pub struct OpenAiVisionAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiVisionAdapter {
    /// Creates a new `OpenAiVisionAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `ExtractionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ExtractionService for OpenAiVisionAdapter {
    /// Sends the receipt image inline and parses the model's JSON answer.
    async fn extract(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<ExtractedPayment, ExtractionError> {
        let data_url = format!(
            "data:{};base64,{}",
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(image)
        );

        let messages = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(vec![
                ChatCompletionRequestMessageContentPartTextArgs::default()
                    .text(EXTRACTION_INSTRUCTIONS)
                    .build()
                    .map_err(request_error)?
                    .into(),
                ChatCompletionRequestMessageContentPartImageArgs::default()
                    .image_url(
                        ImageUrlArgs::default()
                            .url(data_url)
                            .detail(ImageDetail::High)
                            .build()
                            .map_err(request_error)?,
                    )
                    .build()
                    .map_err(request_error)?
                    .into(),
            ])
            .build()
            .map_err(request_error)?
            .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .temperature(0.0)
            .response_format(extraction_response_format())
            .build()
            .map_err(request_error)?;

        info!(model = %self.model, image_size = image.len(), mime_type, "Sending receipt to vision model.");

        // Call the API and map the error by hand, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| ExtractionError::Provider {
                status: None,
                message: e.to_string(),
            })?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ExtractionError::NoData)?;

        debug!("Vision model answered: {}", content);
        parse_extraction(&content)
    }
}

fn request_error(e: OpenAIError) -> ExtractionError {
    ExtractionError::Provider {
        status: None,
        message: e.to_string(),
    }
}

//=========================================================================================
// Response Parsing
//=========================================================================================

/// Asks for structured output: one object with all three fields required.
pub fn extraction_response_format() -> ResponseFormat {
    ResponseFormat::JsonSchema {
        json_schema: ResponseFormatJsonSchema {
            description: Some("Payment details read from a receipt.".to_string()),
            name: "extracted_payment".to_string(),
            schema: Some(serde_json::json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "phoneNumber": { "type": "string" },
                    "amount": { "type": "number" }
                },
                "required": ["name", "phoneNumber", "amount"],
                "additionalProperties": false
            })),
            strict: None,
        },
    }
}

/// The JSON object the model is asked to produce. All keys are required;
/// a `null` name or amount falls back to its default.
#[derive(Deserialize)]
struct ExtractionPayload {
    #[serde(deserialize_with = "Option::deserialize")]
    name: Option<String>,
    #[serde(rename = "phoneNumber")]
    phone_number: String,
    amount: serde_json::Value,
}

/// Parses the model's answer into a payment, tolerating a Markdown code fence.
pub fn parse_extraction(content: &str) -> Result<ExtractedPayment, ExtractionError> {
    let json = strip_code_fence(content);
    let payload: ExtractionPayload =
        serde_json::from_str(json).map_err(|e| ExtractionError::Malformed(e.to_string()))?;

    let name = match payload.name.as_deref().map(str::trim) {
        None | Some("") => UNKNOWN_NAME.to_string(),
        Some(name) => name.to_string(),
    };
    let amount = parse_amount(&payload.amount)?;

    Ok(ExtractedPayment {
        name,
        phone_number: normalize_phone_number(&payload.phone_number),
        amount,
    })
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

fn parse_amount(value: &serde_json::Value) -> Result<f64, ExtractionError> {
    let amount = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            if cleaned.is_empty() {
                Some(0.0)
            } else {
                cleaned.parse::<f64>().ok()
            }
        }
        serde_json::Value::Null => Some(0.0),
        _ => None,
    };

    match amount {
        Some(a) if a.is_finite() && a >= 0.0 => Ok(a),
        _ => Err(ExtractionError::Malformed(format!("invalid amount: {}", value))),
    }
}

/// Reduces a phone number to local `09…` digits.
///
/// Strips everything but digits and rewrites the `63` country prefix to `0`.
pub fn normalize_phone_number(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if let Some(local) = digits.strip_prefix("63").filter(|rest| rest.len() == 10) {
        return format!("0{}", local);
    }
    if digits.len() == 10 && digits.starts_with('9') {
        return format!("0{}", digits);
    }
    digits
}
