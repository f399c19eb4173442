#![allow(dead_code)]

pub mod config;
pub mod mock_upstream;
pub mod server;

/// Parse SSE `data:` payloads from raw response text
pub fn parse_sse_data(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(str::to_owned)
        .collect()
}

/// Concatenate the assistant deltas of an OpenAI-style SSE body
pub fn collect_stream_text(text: &str) -> String {
    parse_sse_data(text)
        .iter()
        .filter(|data| data.as_str() != "[DONE]")
        .filter_map(|data| serde_json::from_str::<serde_json::Value>(data).ok())
        .filter_map(|chunk| chunk["choices"][0]["delta"]["content"].as_str().map(str::to_owned))
        .collect()
}
