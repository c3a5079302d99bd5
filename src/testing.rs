//! Scripted browser and model doubles shared by the unit tests.

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::error::{DigestError, Result};
use crate::llm::{Completion, LanguageModel};
use crate::state::TokenUsage;
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FakePage {
    pub title: String,
    pub html: String,
}

/// Serves canned pages keyed by exact URL
#[derive(Debug, Clone, Default)]
pub struct FakeLauncher {
    pages: Arc<HashMap<String, FakePage>>,
    pub launches: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    fail_launch: bool,
}

impl FakeLauncher {
    pub fn new(pages: Vec<(String, FakePage)>) -> Self {
        Self {
            pages: Arc::new(pages.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Default::default()
        }
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        if self.fail_launch {
            return Err(DigestError::Browser("chrome not found".to_string()));
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            pages: Arc::clone(&self.pages),
            closes: Arc::clone(&self.closes),
            current: None,
        }))
    }
}

pub struct FakeSession {
    pages: Arc<HashMap<String, FakePage>>,
    closes: Arc<AtomicUsize>,
    current: Option<FakePage>,
}

impl FakeSession {
    fn current(&self) -> Result<&FakePage> {
        self.current
            .as_ref()
            .ok_or_else(|| DigestError::Browser("no page loaded".to_string()))
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        match self.pages.get(url) {
            Some(page) => {
                self.current = Some(page.clone());
                Ok(())
            }
            None => {
                self.current = None;
                Err(DigestError::Browser(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)))
            }
        }
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        let page = self.current()?;
        let parsed = Selector::parse(selector).map_err(|e| DigestError::Parse(e.to_string()))?;
        if Html::parse_document(&page.html).select(&parsed).next().is_some() {
            Ok(())
        } else {
            Err(DigestError::Timeout {
                selector: selector.to_string(),
                waited: timeout,
            })
        }
    }

    async fn html(&mut self) -> Result<String> {
        Ok(self.current()?.html.clone())
    }

    async fn title(&mut self) -> Result<String> {
        Ok(self.current()?.title.clone())
    }

    async fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Returns `{"summary": "Summary of <article preview>"}`, failing for prompts that
/// contain `fail_marker`.
#[derive(Debug, Default)]
pub struct FakeModel {
    fail_marker: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Default::default()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate_structured(&self, prompt: &str, _schema: &Value) -> Result<Completion> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(ref marker) = self.fail_marker {
            if prompt.contains(marker.as_str()) {
                return Err(DigestError::Api {
                    code: 429,
                    message: "quota exceeded".to_string(),
                });
            }
        }
        let article = prompt.rsplit("\n\n").next().unwrap_or_default();
        let preview: String = article.chars().take(20).collect();
        Ok(Completion {
            body: serde_json::json!({ "summary": format!("Summary of {}", preview) }).to_string(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
        })
    }
}

/// Search results page wrapping the given anchor markup
pub fn listing(anchors: &str) -> String {
    format!("<html><body>{}</body></html>", anchors)
}

/// Article page with the given body class and paragraphs
pub fn article(body_class: &str, paragraphs: &[&str]) -> String {
    let paras: String = paragraphs.iter().map(|p| format!("<p>{}</p>", p)).collect();
    format!(
        r#"<html><body><div class="{}">{}</div><p>footer outside body</p></body></html>"#,
        body_class, paras
    )
}

/// (paragraph style id, paragraph text) for every body paragraph of a `.docx`
pub fn docx_paragraphs(bytes: &[u8]) -> Vec<(Option<String>, String)> {
    let docx = docx_rs::read_docx(bytes).expect("Failed to read docx");
    let json: Value = serde_json::from_str(&docx.json()).expect("Failed to parse docx json");
    json["document"]["children"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter(|child| child["type"] == "paragraph")
        .map(|child| {
            let data = &child["data"];
            let style = match &data["property"]["style"] {
                Value::String(id) => Some(id.clone()),
                Value::Object(obj) => obj.get("val").and_then(Value::as_str).map(str::to_string),
                _ => None,
            };
            let mut text = String::new();
            collect_text(&data["children"], &mut text);
            (style, text)
        })
        .collect()
}

fn collect_text(node: &Value, out: &mut String) {
    match node {
        Value::Array(items) => items.iter().for_each(|item| collect_text(item, out)),
        Value::Object(obj) => {
            if obj.get("type").and_then(Value::as_str) == Some("text") {
                if let Some(text) = obj.get("data").and_then(|d| d.get("text")).and_then(Value::as_str) {
                    out.push_str(text);
                }
                return;
            }
            obj.values().for_each(|value| collect_text(value, out));
        }
        _ => {}
    }
}
