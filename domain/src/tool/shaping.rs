//! Result shaping: turn raw provider payloads into transcript text.
//!
//! Providers answer `tools/call` with `{content: [{type, text}], isError?}`
//! where `text` is usually itself a JSON document. [`ToolPayload::from_raw`]
//! unwraps that envelope, and [`shape_tool_result`] renders the data with
//! fixed per-tool rules, falling back to a pretty JSON dump whenever no rule
//! matches or the data does not have the expected shape.

use serde_json::Value;

/// Unwrapped result of a `tools/call`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolPayload {
    /// Decoded payload (JSON if the text block parsed, plain string otherwise)
    pub data: Value,
    /// Provider flagged the call as failed (`isError: true`)
    pub is_error: bool,
}

impl ToolPayload {
    /// Unwrap an MCP content envelope.
    ///
    /// Takes the first `type: "text"` block with a non-empty `text` and tries
    /// to decode it as JSON. Results without such a block are returned as-is.
    pub fn from_raw(raw: &Value) -> Self {
        let is_error = raw
            .get("isError")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let text = raw
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|blocks| {
                blocks.iter().find(|b| {
                    b.get("type").and_then(|t| t.as_str()) == Some("text")
                })
            })
            .and_then(|b| b.get("text"))
            .and_then(|t| t.as_str())
            .filter(|t| !t.is_empty());

        let data = match text {
            Some(text) => serde_json::from_str(text)
                .unwrap_or_else(|_| Value::String(text.to_string())),
            None => raw.clone(),
        };

        Self { data, is_error }
    }
}

/// Render a tool result for the transcript.
pub fn shape_tool_result(provider: &str, tool: &str, data: &Value) -> String {
    let shaped = match (provider, tool) {
        ("github", "list_repositories") => shape_repositories(data),
        ("github", "list_pull_requests") => shape_pull_requests(data),
        ("github", "get_pull_request") => shape_pull_request(data),
        ("github", "list_issues") => shape_github_issues(data),
        ("jira", "search_issues") => shape_jira_issues(data),
        ("slack", "list_channels") => shape_channels(data),
        ("docs", "search_docs") => shape_doc_results(data),
        _ => None,
    };
    shaped.unwrap_or_else(|| generic_dump(data))
}

/// Fallback rendering: plain strings verbatim, everything else pretty JSON.
pub fn generic_dump(data: &Value) -> String {
    match data {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn text<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key).and_then(|f| f.as_str()).filter(|s| !s.is_empty())
}

fn display(v: &Value, key: &str) -> String {
    match v.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "N/A".to_string(),
        Some(other) => other.to_string(),
    }
}

fn count(v: &Value, key: &str) -> u64 {
    v.get(key).and_then(|n| n.as_u64()).unwrap_or(0)
}

fn numbered(header: String, items: &[Value], render: impl Fn(&Value) -> String) -> String {
    let body = items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, render(item)))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{}\n{}", header, body)
}

fn shape_repositories(data: &Value) -> Option<String> {
    let repos = data.as_array()?;
    Some(numbered(
        format!("Found {} repositories:", repos.len()),
        repos,
        |repo| {
            format!(
                "**{}**\n   ⭐ {} stars | 🔤 {}\n   📝 {}\n   🔗 {}",
                display(repo, "name"),
                count(repo, "stars"),
                text(repo, "language").unwrap_or("N/A"),
                text(repo, "description").unwrap_or("No description"),
                display(repo, "url"),
            )
        },
    ))
}

fn shape_pull_requests(data: &Value) -> Option<String> {
    let prs = data.as_array()?;
    Some(numbered(
        format!("Found {} pull requests:", prs.len()),
        prs,
        |pr| {
            format!(
                "🔀 #{} - **{}**\n   👤 {} | 📊 {}\n   🔗 {}",
                display(pr, "number"),
                display(pr, "title"),
                display(pr, "author"),
                display(pr, "state"),
                display(pr, "url"),
            )
        },
    ))
}

fn shape_pull_request(data: &Value) -> Option<String> {
    // A single PR is an object carrying at least a number and a title.
    data.get("number")?;
    data.get("title")?;
    let merged = data.get("merged").and_then(|m| m.as_bool()).unwrap_or(false);
    Some(format!(
        "🔀 Pull Request #{}\n\n📝 **{}**\n👤 Author: {}\n📊 State: {}\n{}\n📁 Files: {} | ➕ {} | ➖ {}\n💬 Commits: {}\n🔗 {}\n\n**Description:**\n{}",
        display(data, "number"),
        display(data, "title"),
        display(data, "author"),
        display(data, "state"),
        if merged { "✅ Merged" } else { "⏳ Not merged" },
        count(data, "files_changed"),
        count(data, "additions"),
        count(data, "deletions"),
        count(data, "commits"),
        display(data, "url"),
        text(data, "body").unwrap_or("No description"),
    ))
}

fn shape_github_issues(data: &Value) -> Option<String> {
    let issues = data.as_array()?;
    Some(numbered(
        format!("Found {} issues:", issues.len()),
        issues,
        |issue| {
            let labels: Vec<&str> = issue
                .get("labels")
                .and_then(|l| l.as_array())
                .map(|arr| arr.iter().filter_map(|l| l.as_str()).collect())
                .unwrap_or_default();
            let labels = if labels.is_empty() {
                "No labels".to_string()
            } else {
                labels.join(", ")
            };
            format!(
                "🐛 #{} - **{}**\n   👤 {} | 📊 {}\n   🏷️ {}\n   🔗 {}",
                display(issue, "number"),
                display(issue, "title"),
                display(issue, "author"),
                display(issue, "state"),
                labels,
                display(issue, "url"),
            )
        },
    ))
}

fn shape_jira_issues(data: &Value) -> Option<String> {
    let issues = data.get("issues")?.as_array()?;
    let total = data
        .get("total")
        .and_then(|t| t.as_u64())
        .unwrap_or(issues.len() as u64);
    Some(numbered(format!("Found {} issues:", total), issues, |issue| {
        format!(
            "🎯 **{}** - {}\n   📊 {} | 🔴 {}\n   👤 {}",
            display(issue, "key"),
            display(issue, "summary"),
            display(issue, "status"),
            display(issue, "priority"),
            display(issue, "assignee"),
        )
    }))
}

fn shape_channels(data: &Value) -> Option<String> {
    let channels = data.as_array()?;
    Some(numbered(
        format!("Found {} channels:", channels.len()),
        channels,
        |ch| {
            let private = ch.get("is_private").and_then(|p| p.as_bool()).unwrap_or(false);
            format!(
                "💬 **#{}** {}\n   👥 {} members\n   📝 {}",
                display(ch, "name"),
                if private { "🔒" } else { "🌐" },
                count(ch, "member_count"),
                text(ch, "topic").unwrap_or("No topic"),
            )
        },
    ))
}

fn shape_doc_results(data: &Value) -> Option<String> {
    let results = data.get("results")?.as_array()?;
    let total = data
        .get("results_count")
        .and_then(|t| t.as_u64())
        .unwrap_or(results.len() as u64);
    Some(numbered(format!("Found {} results:", total), results, |doc| {
        format!(
            "📚 **{}**\n   🔗 {}\n   📝 {}",
            display(doc, "title"),
            display(doc, "url"),
            display(doc, "snippet"),
        )
    }))
}
