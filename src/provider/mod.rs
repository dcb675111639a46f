//! Capability-provider boundary. The reasoning backend is a black box that
//! consumes a role descriptor plus a task spec and returns result text; a
//! provider failure is an unhandled stage failure that aborts the run.

pub mod http;

pub use http::{HttpProvider, HttpProviderConfig, ProviderCredentials};

use crate::roles::RoleDescriptor;
use crate::tasks::TaskSpec;
use crate::tools::ToolHost;

pub const TOOL_CALL_OPEN: &str = "[tool_call]";
pub const TOOL_CALL_CLOSE: &str = "[/tool_call]";

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("provider response decode failed: {0}")]
    Decode(String),
    #[error("provider returned no message content")]
    EmptyResponse,
    #[error("provider exhausted {0} tool rounds without a final answer")]
    ToolRoundsExhausted(u32),
}

pub trait CapabilityProvider {
    fn invoke(
        &self,
        role: &RoleDescriptor,
        task: &TaskSpec,
        tools: &ToolHost,
    ) -> Result<String, ProviderError>;
}

impl<T: CapabilityProvider + ?Sized> CapabilityProvider for &T {
    fn invoke(
        &self,
        role: &RoleDescriptor,
        task: &TaskSpec,
        tools: &ToolHost,
    ) -> Result<String, ProviderError> {
        (**self).invoke(role, task, tools)
    }
}

/// One tool request carried in a reply envelope.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ToolCallRequest {
    pub tool: String,
    pub input: String,
}

/// Extracts a `[tool_call]{...}[/tool_call]` envelope from a reply.
/// `None` means the reply is a final answer. A present-but-malformed
/// envelope comes back as the parse failure text so the caller can feed it
/// back to the provider instead of aborting.
pub fn parse_tool_call(content: &str) -> Option<Result<ToolCallRequest, String>> {
    let start = content.find(TOOL_CALL_OPEN)?;
    let after_open = &content[start + TOOL_CALL_OPEN.len()..];
    let Some(end) = after_open.find(TOOL_CALL_CLOSE) else {
        return Some(Err("unterminated tool_call envelope".to_string()));
    };
    let body = after_open[..end].trim();
    Some(serde_json::from_str(body).map_err(|err| format!("invalid tool_call json: {err}")))
}
