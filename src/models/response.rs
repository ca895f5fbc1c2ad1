use serde::{Deserialize, Serialize};

/// Non-streaming reply from `POST /api/generate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,
}

/// Reply from `POST /api/tokenize`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenizeResponse {
    pub tokens: Vec<i64>,
}

/// Reply from `POST /api/detokenize`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetokenizeResponse {
    pub text: String,
}

/// Reply from `POST /api/embed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedResponse {
    #[serde(default)]
    pub model: String,
    pub embeddings: Vec<Vec<f32>>,
}

/// A locally installed model as listed by `GET /api/tags`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Reply from `GET /api/tags`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub models: Vec<ModelSummary>,
}

impl ModelList {
    pub fn names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }
}

/// A model currently loaded in memory, from `GET /api/ps`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningModel {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Reply from `GET /api/ps`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunningModels {
    #[serde(default)]
    pub models: Vec<RunningModel>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generate_response_deserializes_terminal_reply() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "model": "llama3.2",
            "created_at": "2024-08-04T19:22:45.499127Z",
            "response": "The sky is blue because...",
            "done": true,
            "done_reason": "stop",
            "context": [1, 2, 3],
            "total_duration": 10706818083u64
        }))
        .unwrap();

        assert!(response.done);
        assert_eq!(response.context, Some(vec![1, 2, 3]));
        assert_eq!(response.done_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn test_model_list_names() {
        let list: ModelList = serde_json::from_value(json!({
            "models": [
                {"name": "llama3.2:latest", "size": 2019393189u64},
                {"name": "llava:7b"}
            ]
        }))
        .unwrap();
        assert_eq!(list.names(), vec!["llama3.2:latest", "llava:7b"]);
    }

    #[test]
    fn test_running_models_empty() {
        let running: RunningModels = serde_json::from_value(json!({})).unwrap();
        assert!(running.models.is_empty());
    }

    #[test]
    fn test_embed_response() {
        let embed: EmbedResponse = serde_json::from_value(json!({
            "model": "all-minilm",
            "embeddings": [[0.1, -0.2, 0.3]]
        }))
        .unwrap();
        assert_eq!(embed.embeddings[0].len(), 3);
    }
}
