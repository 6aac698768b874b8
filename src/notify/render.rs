//! HTML rendering of an insight for email delivery.
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::insight::{InsightKind, InsightResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestEmail {
    pub subject: String,
    pub html: String,
}

fn title_for(result: &InsightResult) -> String {
    match result.kind {
        InsightKind::DailySummary => format!("Daily Market Digest - {}", result.query_or_date),
        InsightKind::TopicSearch => format!("Market Digest: {}", result.query_or_date),
        InsightKind::DiscussionSentiment => format!("Discussion Digest: {}", result.query_or_date),
    }
}

/// Analysis text → HTML blocks. Lines ending in ':' become headings,
/// "* " / "- " lines become list items, anything else a paragraph.
pub fn render_analysis(text: &str) -> String {
    let mut out = String::new();
    let mut in_list = false;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let item = line.strip_prefix("* ").or_else(|| line.strip_prefix("- "));
        if item.is_none() && in_list {
            out.push_str("</ul>\n");
            in_list = false;
        }
        match item {
            Some(body) => {
                if !in_list {
                    out.push_str("<ul>\n");
                    in_list = true;
                }
                out.push_str(&format!("<li>{}</li>\n", encode_text(body.trim())));
            }
            None if line.ends_with(':') => {
                out.push_str(&format!("<h4>{}</h4>\n", encode_text(line)));
            }
            None => out.push_str(&format!("<p>{}</p>\n", encode_text(line))),
        }
    }
    if in_list {
        out.push_str("</ul>\n");
    }
    out
}

/// Subject and HTML body. Rendered once per distribution.
pub fn render_digest(result: &InsightResult) -> DigestEmail {
    let title = title_for(result);
    let links: String = result
        .top_records
        .iter()
        .map(|r| {
            let title = encode_text(&r.title);
            let source = encode_text(&r.source_label);
            if r.url.is_empty() {
                format!("<li>{title} - <i>{source}</i></li>\n")
            } else {
                format!(
                    "<li><a href=\"{}\" target=\"_blank\">{title}</a> - <i>{source}</i></li>\n",
                    encode_double_quoted_attribute(&r.url)
                )
            }
        })
        .collect();

    let html = format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; color: #2e2e2e; padding: 20px;">
<h2 style="color: #1f4e79;">{heading}</h2>
<p><b>Sentiment Score:</b> {sentiment:.2} <span style="color: gray;">({count} sources analyzed)</span></p>
<div style="margin-top: 20px;">
{analysis}</div>
<h3 style="margin-top: 30px;">Top Sources</h3>
<ul>
{links}</ul>
<p style="margin-top: 30px; font-size: 12px; color: gray;">
Sent by <b>Market Intel Digest</b>. This is not financial advice.<br>
You are receiving this email because you subscribed to the daily digest.
</p>
</body>
</html>
"#,
        heading = encode_text(&title),
        sentiment = result.sentiment_score,
        count = result.article_count,
        analysis = render_analysis(&result.analysis_text),
    );

    DigestEmail {
        subject: format!("Your {title}"),
        html,
    }
}
