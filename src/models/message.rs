use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    #[default]
    User,
    Assistant,
    Tool,
}

/// A single message in a chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    /// Base64-encoded images for vision models
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    /// Function calls requested by the assistant
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: Vec::new(),
            tool_calls: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Attach a base64-encoded image (builder pattern)
    pub fn with_image(mut self, base64_image: impl Into<String>) -> Self {
        self.images.push(base64_image.into());
        self
    }
}

/// A function call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

/// Name and arguments of a requested function call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Arguments object as produced by the model
    #[serde(default)]
    pub arguments: Value,
}

/// A tool definition offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    #[serde(rename = "type", default = "default_tool_type")]
    pub tool_type: String,
    pub function: ToolFunction,
}

fn default_tool_type() -> String {
    "function".to_string()
}

impl Tool {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            tool_type: default_tool_type(),
            function: ToolFunction {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// JSON-schema description of a callable function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFunction {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_message_serialization_omits_empty_fields() {
        let msg = ChatMessage::user("Hello");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "Hello"}));
    }

    #[test]
    fn test_chat_message_with_image() {
        let msg = ChatMessage::user("What is this?").with_image("aGVsbG8=");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["images"], json!(["aGVsbG8="]));
    }

    #[test]
    fn test_assistant_message_with_tool_calls_deserializes() {
        let msg: ChatMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": "",
            "tool_calls": [
                {"function": {"name": "get_weather", "arguments": {"city": "Paris"}}}
            ]
        }))
        .unwrap();

        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.tool_calls.len(), 1);
        assert_eq!(msg.tool_calls[0].function.name, "get_weather");
        assert_eq!(msg.tool_calls[0].function.arguments["city"], "Paris");
    }

    #[test]
    fn test_tool_definition_shape() {
        let tool = Tool::function(
            "get_delivery_date",
            "Get the delivery date for an order",
            json!({"type": "object", "properties": {"order_id": {"type": "string"}}}),
        );
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "get_delivery_date");
    }

    #[test]
    fn test_tool_type_defaults_to_function() {
        let tool: Tool = serde_json::from_value(json!({
            "function": {"name": "noop"}
        }))
        .unwrap();
        assert_eq!(tool.tool_type, "function");
        assert_eq!(tool.function.parameters, Value::Null);
    }
}
