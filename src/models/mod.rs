//! Wire types for the model server's JSON endpoints.

mod message;
mod request;
mod response;

pub use message::{ChatMessage, FunctionCall, Role, Tool, ToolCall, ToolFunction};
pub use request::{
    ChatCompletionRequest, ChatRequest, CreateModelRequest, DetokenizeRequest, EmbedRequest,
    GenerateRequest, ModelNameRequest, StopRequest, TokenizeRequest,
};
pub use response::{
    DetokenizeResponse, EmbedResponse, GenerateResponse, ModelList, ModelSummary, RunningModel,
    RunningModels, TokenizeResponse,
};
