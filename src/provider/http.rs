//! OpenAI-compatible chat-completions adapter with a bounded,
//! envelope-driven tool loop.

use crate::provider::{
    parse_tool_call, CapabilityProvider, ProviderError, TOOL_CALL_CLOSE, TOOL_CALL_OPEN,
};
use crate::roles::RoleDescriptor;
use crate::tasks::TaskSpec;
use crate::tools::{ToolHost, ToolId};
use serde_json::{json, Value};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_MAX_TOOL_ROUNDS: u32 = 6;

/// The two opaque secrets the binding layer consumes; constructor-only.
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub api_key: String,
    pub api_org: String,
}

#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tool_rounds: u32,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpProvider {
    credentials: ProviderCredentials,
    config: HttpProviderConfig,
}

impl HttpProvider {
    pub fn new(credentials: ProviderCredentials, config: HttpProviderConfig) -> Self {
        Self {
            credentials,
            config,
        }
    }

    fn request_completion(&self, messages: &[Value]) -> Result<String, ProviderError> {
        let mut request = ureq::post(&self.config.endpoint)
            .set("Authorization", &format!("Bearer {}", self.credentials.api_key));
        if !self.credentials.api_org.is_empty() {
            request = request.set("OpenAI-Organization", &self.credentials.api_org);
        }

        let response = request
            .send_json(json!({
                "model": self.config.model,
                "messages": messages,
            }))
            .map_err(|err| ProviderError::Request(err.to_string()))?;

        let body: Value = response
            .into_json()
            .map_err(|err| ProviderError::Decode(err.to_string()))?;
        let content = body
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .map(|text| text.trim().to_string())
            .ok_or(ProviderError::EmptyResponse)?;
        if content.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(content)
    }

    fn resolve_tool_output(
        role: &RoleDescriptor,
        tools: &ToolHost,
        parsed: Result<crate::provider::ToolCallRequest, String>,
    ) -> String {
        match parsed {
            Ok(call) => match ToolId::try_from(call.tool.as_str()) {
                Ok(id) if role.tools.contains(&id) => tools.run(id, &call.input),
                Ok(id) => format!("Error: tool `{id}` is not available to this role."),
                Err(reason) => format!("Error: {reason}"),
            },
            Err(reason) => format!("Error: malformed tool call: {reason}"),
        }
    }
}

impl CapabilityProvider for HttpProvider {
    fn invoke(
        &self,
        role: &RoleDescriptor,
        task: &TaskSpec,
        tools: &ToolHost,
    ) -> Result<String, ProviderError> {
        let mut messages = vec![
            json!({"role": "system", "content": render_system_prompt(role)}),
            json!({"role": "user", "content": render_task_prompt(task)}),
        ];

        for _ in 0..self.config.max_tool_rounds {
            let content = self.request_completion(&messages)?;
            let Some(parsed) = parse_tool_call(&content) else {
                return Ok(content);
            };
            let tool_output = Self::resolve_tool_output(role, tools, parsed);
            messages.push(json!({"role": "assistant", "content": content}));
            messages.push(json!({
                "role": "user",
                "content": format!("[tool_result]\n{tool_output}\n[/tool_result]"),
            }));
        }

        Err(ProviderError::ToolRoundsExhausted(
            self.config.max_tool_rounds,
        ))
    }
}

pub(crate) fn render_system_prompt(role: &RoleDescriptor) -> String {
    let mut prompt = format!("{}\n\nObjective: {}", role.persona, role.objective);
    if !role.tools.is_empty() {
        prompt.push_str("\n\nAvailable tools:");
        for tool in &role.tools {
            prompt.push_str(&format!("\n- {}", tool.describe()));
        }
        prompt.push_str(&format!(
            "\n\nTo call a tool, reply with exactly one {TOOL_CALL_OPEN}{{\"tool\":\"<name>\",\"input\":\"<text>\"}}{TOOL_CALL_CLOSE} envelope and nothing else. The tool output arrives in a [tool_result] block. When you have the final answer, reply with it directly and no envelope."
        ));
    }
    prompt
}

pub(crate) fn render_task_prompt(task: &TaskSpec) -> String {
    format!(
        "{}\n\nExpected output: {}",
        task.instruction, task.expected_output
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(tools: Vec<ToolId>) -> RoleDescriptor {
        RoleDescriptor {
            name: "analyst".to_string(),
            objective: "answer questions".to_string(),
            persona: "Senior Data Analyst\ncareful".to_string(),
            tools,
            allow_code_execution: true,
        }
    }

    #[test]
    fn system_prompt_lists_tools_and_envelope_contract() {
        let prompt = render_system_prompt(&role(vec![ToolId::PythonRepl]));
        assert!(prompt.contains("python_repl"));
        assert!(prompt.contains(TOOL_CALL_OPEN));
    }

    #[test]
    fn system_prompt_omits_tool_contract_for_bare_roles() {
        let prompt = render_system_prompt(&role(Vec::new()));
        assert!(!prompt.contains(TOOL_CALL_OPEN));
    }

    #[test]
    fn unavailable_tools_resolve_to_error_text() {
        let host = ToolHost::new();
        let out = HttpProvider::resolve_tool_output(
            &role(vec![ToolId::PlotStyle]),
            &host,
            Ok(crate::provider::ToolCallRequest {
                tool: "python_repl".to_string(),
                input: "print(1)".to_string(),
            }),
        );
        assert!(out.contains("not available"));
    }
}
