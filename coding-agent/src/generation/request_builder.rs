//! Request body construction for chat completion calls.

use serde_json::{json, Value};

use crate::protocol::ChatMessage;

/// Build a non-streaming chat completions body for one system + user exchange.
pub fn build_chat_request_body(
    model: &str,
    system: &str,
    prompt: &str,
    temperature: f32,
    max_tokens: u32,
) -> Value {
    let messages = [ChatMessage::system(system), ChatMessage::user(prompt)];

    let mut body = json!({
        "model": model,
        "messages": messages,
        "stream": false,
    });
    body["temperature"] = json!(temperature);
    if max_tokens > 0 {
        body["max_tokens"] = json!(max_tokens);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_carries_both_messages_in_order() {
        let body = build_chat_request_body("gpt-4", "be terse", "sort a list", 0.3, 1500);
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 1500);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be terse");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "sort a list");
        let temperature = body["temperature"].as_f64().unwrap();
        assert!((temperature - 0.3).abs() < 1e-6);
    }

    #[test]
    fn zero_token_budget_is_omitted() {
        let body = build_chat_request_body("gpt-4", "s", "p", 0.0, 0);
        assert!(body.get("max_tokens").is_none());
    }
}
